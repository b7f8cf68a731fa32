use async_trait::async_trait;
use reqwest::header::{HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::StatusCode;

use crate::error::ProbeError;
use crate::jsonrpc::{decode_response, JsonRpcRequest};
use crate::session::{Capability, CapabilityResult, CapabilitySession};

pub const PROTOCOL_VERSION: &str = "2025-03-26";
const SESSION_HEADER: &str = "mcp-session-id";
const PROTOCOL_HEADER: &str = "mcp-protocol-version";

pub struct McpHttpSession {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    session_id: Option<String>,
    protocol_version: Option<String>,
    next_id: u64,
}

impl McpHttpSession {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            session_id: None,
            protocol_version: None,
            next_id: 1,
        }
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    fn post(&self, body: &JsonRpcRequest<'_>) -> reqwest::RequestBuilder {
        let mut req = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .header(ACCEPT, "application/json, text/event-stream")
            .json(body);
        if let Some(ref id) = self.session_id {
            req = req.header(SESSION_HEADER, id);
        }
        if let Some(ref version) = self.protocol_version {
            req = req.header(PROTOCOL_HEADER, version);
        }
        req
    }

    /// Check status and remember the session id the server hands out.
    async fn accept(&mut self, response: reqwest::Response) -> Result<reqwest::Response, ProbeError> {
        if let Some(id) = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
        {
            if self.session_id.as_deref() != Some(id) {
                tracing::debug!(session_id = id, "Captured MCP session id");
                self.session_id = Some(id.to_string());
            }
        }

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ProbeError::Unauthorized(status));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProbeError::Status { status, body });
        }
        Ok(response)
    }

    async fn request(
        &mut self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, ProbeError> {
        let id = self.next_id;
        self.next_id += 1;

        tracing::debug!(method, id, endpoint = %self.endpoint, "Sending MCP request");
        let response = self
            .post(&JsonRpcRequest::call(id, method, params))
            .send()
            .await?;
        let response = self.accept(response).await?;

        let is_sse = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v: &HeaderValue| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("text/event-stream"));
        let body = response.text().await?;

        decode_response(&body, is_sse, id)?.into_result()
    }

    async fn notify(&mut self, method: &str) -> Result<(), ProbeError> {
        tracing::debug!(method, "Sending MCP notification");
        let response = self.post(&JsonRpcRequest::notification(method)).send().await?;
        self.accept(response).await?;
        Ok(())
    }
}

#[async_trait]
impl CapabilitySession for McpHttpSession {
    async fn connect(&mut self) -> Result<(), ProbeError> {
        let result = self
            .request(
                "initialize",
                serde_json::json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": {},
                    "clientInfo": {
                        "name": env!("CARGO_PKG_NAME"),
                        "version": env!("CARGO_PKG_VERSION"),
                    }
                }),
            )
            .await?;

        let negotiated = result["protocolVersion"]
            .as_str()
            .unwrap_or(PROTOCOL_VERSION)
            .to_string();
        tracing::info!(
            server = %result["serverInfo"]["name"].as_str().unwrap_or("unknown"),
            protocol = %negotiated,
            "MCP session initialized"
        );
        self.protocol_version = Some(negotiated);

        self.notify("notifications/initialized").await
    }

    async fn ping(&mut self) -> Result<(), ProbeError> {
        self.request("ping", serde_json::json!({})).await?;
        Ok(())
    }

    async fn list_capabilities(&mut self) -> Result<Vec<Capability>, ProbeError> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let params = match cursor.take() {
                Some(c) => serde_json::json!({ "cursor": c }),
                None => serde_json::json!({}),
            };
            let mut page = self.request("tools/list", params).await?;
            let raw = page.get_mut("tools").map(serde_json::Value::take).unwrap_or_default();
            let batch: Vec<Capability> = serde_json::from_value(raw)
                .map_err(|e| ProbeError::Protocol(format!("malformed tools/list result: {e}")))?;
            tools.extend(batch);

            match page["nextCursor"].as_str() {
                Some(next) if !next.is_empty() => cursor = Some(next.to_string()),
                _ => break,
            }
        }
        Ok(tools)
    }

    async fn invoke_capability(
        &mut self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<CapabilityResult, ProbeError> {
        tracing::info!(tool = name, "Calling MCP tool");
        let result = self
            .request(
                "tools/call",
                serde_json::json!({ "name": name, "arguments": arguments }),
            )
            .await?;
        let result: CapabilityResult = serde_json::from_value(result)
            .map_err(|e| ProbeError::Protocol(format!("malformed tools/call result: {e}")))?;
        if result.is_error {
            return Err(ProbeError::ToolError {
                name: name.to_string(),
                message: result.text(),
            });
        }
        Ok(result)
    }

    async fn close(&mut self) {
        let Some(id) = self.session_id.take() else {
            return;
        };
        let outcome = self
            .client
            .delete(&self.endpoint)
            .bearer_auth(&self.api_key)
            .header(SESSION_HEADER, &id)
            .send()
            .await;
        if let Err(e) = outcome {
            tracing::debug!(error = %e, "Session teardown failed");
        }
    }
}
