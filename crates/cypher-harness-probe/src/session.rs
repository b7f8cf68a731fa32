use async_trait::async_trait;
use serde::Deserialize;

use crate::error::ProbeError;

/// A remote tool as listed by the server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Capability {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl Capability {
    pub fn summary_line(&self) -> Option<&str> {
        self.description
            .as_deref()
            .filter(|d| !d.is_empty())
            .and_then(|d| d.lines().next())
    }
}

/// One content block of a tool result.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CapabilityResult {
    #[serde(default)]
    pub content: Vec<ContentBlock>,
    #[serde(default, rename = "isError")]
    pub is_error: bool,
}

impl CapabilityResult {
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|c| c.text.as_deref())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// The operations the probe needs from a server session.
#[async_trait]
pub trait CapabilitySession: Send {
    /// Open the session (handshake).
    async fn connect(&mut self) -> Result<(), ProbeError>;

    /// Liveness check.
    async fn ping(&mut self) -> Result<(), ProbeError>;

    async fn list_capabilities(&mut self) -> Result<Vec<Capability>, ProbeError>;

    async fn invoke_capability(
        &mut self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<CapabilityResult, ProbeError>;

    /// Best-effort teardown.
    async fn close(&mut self);
}
