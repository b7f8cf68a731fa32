use std::fmt;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Authentication rejected by server (HTTP {0})")]
    Unauthorized(reqwest::StatusCode),

    #[error("Server returned HTTP {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("JSON-RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Tool '{name}' reported an error: {message}")]
    ToolError { name: String, message: String },

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Invalid JSON: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Where the probe session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeStage {
    Idle,
    Connected,
    Authenticated,
    Listing,
    Invoking,
    Summarizing,
    Closed,
    Failed,
}

impl fmt::Display for ProbeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProbeStage::Idle => "idle",
            ProbeStage::Connected => "connect",
            ProbeStage::Authenticated => "ping",
            ProbeStage::Listing => "list tools",
            ProbeStage::Invoking => "tool call",
            ProbeStage::Summarizing => "schema summary",
            ProbeStage::Closed => "close",
            ProbeStage::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// A [`ProbeError`] tagged with the stage the session was moving into.
#[derive(Error, Debug)]
#[error("{stage} failed: {source}")]
pub struct ProbeFailure {
    pub stage: ProbeStage,
    #[source]
    pub source: ProbeError,
}
