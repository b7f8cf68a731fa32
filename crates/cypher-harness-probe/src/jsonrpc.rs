use serde::{Deserialize, Serialize};

use crate::error::ProbeError;

#[derive(Debug, Serialize)]
pub struct JsonRpcRequest<'a> {
    pub jsonrpc: &'static str,
    /// `None` for notifications.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl<'a> JsonRpcRequest<'a> {
    pub fn call(id: u64, method: &'a str, params: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id: Some(id),
            method,
            params: Some(params),
        }
    }

    pub fn notification(method: &'a str) -> Self {
        Self {
            jsonrpc: "2.0",
            id: None,
            method,
            params: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcErrorObject {
    pub code: i64,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<JsonRpcErrorObject>,
}

impl JsonRpcResponse {
    fn answers(&self, id: u64) -> bool {
        self.id.as_ref().and_then(|v| v.as_u64()) == Some(id)
    }

    pub fn into_result(self) -> Result<serde_json::Value, ProbeError> {
        if let Some(error) = self.error {
            return Err(ProbeError::Rpc {
                code: error.code,
                message: error.message,
            });
        }
        Ok(self.result.unwrap_or(serde_json::Value::Null))
    }
}

/// A parsed `text/event-stream` event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct SseEvent {
    event: Option<String>,
    data: String,
}

fn parse_sse_events(body: &str) -> Vec<SseEvent> {
    let normalized = body.replace("\r\n", "\n");
    let mut events = Vec::new();

    for raw_event in normalized.split("\n\n") {
        let mut event = SseEvent::default();
        let mut has_data = false;

        for line in raw_event.lines() {
            if line.is_empty() || line.starts_with(':') {
                continue;
            }
            let (field, value) = match line.split_once(':') {
                Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
                None => (line, ""),
            };
            match field {
                "event" => event.event = Some(value.to_string()),
                "data" => {
                    if has_data {
                        event.data.push('\n');
                    }
                    event.data.push_str(value);
                    has_data = true;
                }
                // id, retry
                _ => {}
            }
        }

        if has_data {
            events.push(event);
        }
    }
    events
}

/// Find the response to request `id` in a response body of either content
/// type. Unrelated messages (server notifications) are skipped.
pub fn decode_response(body: &str, is_sse: bool, id: u64) -> Result<JsonRpcResponse, ProbeError> {
    if !is_sse {
        return Ok(serde_json::from_str(body)?);
    }

    for event in parse_sse_events(body) {
        if event.event.as_deref().is_some_and(|e| e != "message") {
            continue;
        }
        match serde_json::from_str::<JsonRpcResponse>(&event.data) {
            Ok(response) if response.answers(id) => return Ok(response),
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(data = %event.data, error = %e, "Skipping non-response SSE event");
            }
        }
    }
    Err(ProbeError::Protocol(format!(
        "no response for request {id} in event stream"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notification_has_no_id_or_params() {
        let json = serde_json::to_value(JsonRpcRequest::notification("notifications/initialized"))
            .unwrap();
        assert_eq!(
            json,
            serde_json::json!({"jsonrpc": "2.0", "method": "notifications/initialized"})
        );
    }

    #[test]
    fn sse_body_yields_matching_response() {
        let body = "event: message\r\n\
                    data: {\"jsonrpc\":\"2.0\",\"method\":\"notifications/message\",\"params\":{}}\r\n\
                    \r\n\
                    : keep-alive\r\n\
                    \r\n\
                    id: 7\r\n\
                    event: message\r\n\
                    data: {\"jsonrpc\":\"2.0\",\"id\":3,\r\n\
                    data:  \"result\":{\"ok\":true}}\r\n\
                    \r\n";
        let response = decode_response(body, true, 3).unwrap();
        assert_eq!(
            response.into_result().unwrap(),
            serde_json::json!({"ok": true})
        );
    }

    #[test]
    fn sse_without_matching_id_is_protocol_error() {
        let body = "data: {\"jsonrpc\":\"2.0\",\"id\":1,\"result\":{}}\n\n";
        assert!(matches!(
            decode_response(body, true, 2),
            Err(ProbeError::Protocol(_))
        ));
    }

    #[test]
    fn rpc_error_surfaces() {
        let body = r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32601,"message":"Method not found"}}"#;
        let err = decode_response(body, false, 1)
            .unwrap()
            .into_result()
            .unwrap_err();
        assert!(matches!(err, ProbeError::Rpc { code: -32601, .. }));
    }
}
