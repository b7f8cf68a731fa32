use std::io::Write;
use std::path::{Path, PathBuf};

use cypher_harness_core::config::NEO4J_API_KEY;
use cypher_harness_core::{EnvFile, HarnessError};

use crate::error::{ProbeError, ProbeFailure, ProbeStage};
use crate::schema::SchemaSummary;
use crate::session::{Capability, CapabilitySession};

/// Endpoint the probe always talks to.
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8001/mcp/";

/// Tool invoked once per probe run.
pub const SCHEMA_TOOL: &str = "get_neo4j_schema";

/// Result of looking up the API key before any network traffic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiKeyLookup {
    Found(String),
    FileMissing(PathBuf),
    KeyMissing(PathBuf),
}

/// Read `NEO4J_API_KEY` from `env_file`. When the file exists but has no
/// key, `fallback` (normally the process environment) is consulted.
pub fn load_api_key(
    env_file: &Path,
    fallback: impl Fn(&str) -> Option<String>,
) -> Result<ApiKeyLookup, HarnessError> {
    let env = match EnvFile::from_file(env_file) {
        Ok(env) => env,
        Err(HarnessError::EnvFileMissing { path }) => return Ok(ApiKeyLookup::FileMissing(path)),
        Err(e) => return Err(e),
    };
    let key = env
        .get(NEO4J_API_KEY)
        .map(str::to_string)
        .or_else(|| fallback(NEO4J_API_KEY).filter(|k| !k.is_empty()));
    Ok(match key {
        Some(key) => ApiKeyLookup::Found(key),
        None => ApiKeyLookup::KeyMissing(env_file.to_path_buf()),
    })
}

/// First 16 characters of a key, for display.
pub fn key_preview(key: &str) -> String {
    let head: String = key.chars().take(16).collect();
    format!("{head}...")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReport {
    pub capabilities: Vec<Capability>,
    /// Content type of the first result block, if any.
    pub result_kind: Option<String>,
    /// `None` when the tool returned no content.
    pub schema: Option<SchemaSummary>,
}

/// Drives one session through
/// `Idle -> Connected -> Authenticated -> Listing -> Invoking -> Summarizing -> Closed`,
/// writing progress to `out`. No step is retried.
pub struct ProbeRunner<'a, S, W> {
    session: &'a mut S,
    out: &'a mut W,
    stage: ProbeStage,
}

impl<'a, S: CapabilitySession, W: Write> ProbeRunner<'a, S, W> {
    pub fn new(session: &'a mut S, out: &'a mut W) -> Self {
        Self {
            session,
            out,
            stage: ProbeStage::Idle,
        }
    }

    fn fail(&mut self, attempted: ProbeStage, source: ProbeError) -> ProbeFailure {
        tracing::warn!(stage = %attempted, error = %source, "Probe failed");
        self.stage = ProbeStage::Failed;
        ProbeFailure {
            stage: attempted,
            source,
        }
    }

    fn advance(&mut self, next: ProbeStage) {
        tracing::debug!(from = ?self.stage, to = ?next, "Probe stage");
        self.stage = next;
    }

    // Console write failures are not worth failing the probe over.
    fn say(&mut self, line: impl AsRef<str>) {
        let _ = writeln!(self.out, "{}", line.as_ref());
    }

    pub async fn run(mut self) -> Result<ProbeReport, ProbeFailure> {
        let result = self.drive().await;
        self.session.close().await;
        if result.is_ok() {
            self.advance(ProbeStage::Closed);
        }
        result
    }

    async fn drive(&mut self) -> Result<ProbeReport, ProbeFailure> {
        if let Err(e) = self.session.connect().await {
            return Err(self.fail(ProbeStage::Connected, e));
        }
        self.advance(ProbeStage::Connected);

        self.say("Testing connection...");
        if let Err(e) = self.session.ping().await {
            return Err(self.fail(ProbeStage::Authenticated, e));
        }
        self.advance(ProbeStage::Authenticated);
        self.say("✓ Connection successful");
        self.say("");

        self.say("Available Tools:");
        self.say("-".repeat(60));
        let capabilities = match self.session.list_capabilities().await {
            Ok(c) => c,
            Err(e) => return Err(self.fail(ProbeStage::Listing, e)),
        };
        self.advance(ProbeStage::Listing);
        for (i, cap) in capabilities.iter().enumerate() {
            self.say(format!("{}. {}", i + 1, cap.name));
            if let Some(line) = cap.summary_line() {
                self.say(format!("   {line}"));
            }
        }
        self.say("");

        self.say(format!("Calling {SCHEMA_TOOL} tool..."));
        self.say("-".repeat(60));
        let result = match self
            .session
            .invoke_capability(SCHEMA_TOOL, serde_json::json!({}))
            .await
        {
            Ok(r) => r,
            Err(e) => return Err(self.fail(ProbeStage::Invoking, e)),
        };
        self.advance(ProbeStage::Invoking);
        let result_kind = result.content.first().map(|c| c.kind.clone());
        self.say("✓ Tool call successful");
        self.say(format!(
            "  Result type: {}",
            result_kind.as_deref().unwrap_or("(empty)")
        ));
        self.say("");

        let schema = match result.content.first() {
            Some(first) => {
                let text = first.text.as_deref().unwrap_or_default();
                let summary = match SchemaSummary::from_json(text) {
                    Ok(s) => s,
                    Err(e) => return Err(self.fail(ProbeStage::Summarizing, e)),
                };
                self.advance(ProbeStage::Summarizing);
                self.say("Neo4j Schema Summary:");
                self.say("-".repeat(60));
                let rendered = summary.to_string();
                let _ = write!(self.out, "{rendered}");
                Some(summary)
            }
            None => None,
        };

        Ok(ProbeReport {
            capabilities,
            result_kind,
            schema,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::session::{CapabilityResult, ContentBlock};

    const SCHEMA: &str = r#"{"Person":{"type":"node","properties":{"name":{}},"count":5},"KNOWS":{"type":"relationship","properties":{},"count":2}}"#;

    #[derive(Default)]
    struct FakeSession {
        calls: Vec<String>,
        fail_on: Option<&'static str>,
        schema_text: Option<&'static str>,
    }

    impl FakeSession {
        fn step(&mut self, name: &str) -> Result<(), ProbeError> {
            self.calls.push(name.to_string());
            if self.fail_on == Some(name) {
                return Err(ProbeError::Protocol(format!("{name} exploded")));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl CapabilitySession for FakeSession {
        async fn connect(&mut self) -> Result<(), ProbeError> {
            self.step("connect")
        }

        async fn ping(&mut self) -> Result<(), ProbeError> {
            self.step("ping")
        }

        async fn list_capabilities(&mut self) -> Result<Vec<Capability>, ProbeError> {
            self.step("list")?;
            Ok(["get_neo4j_schema", "read_neo4j_cypher", "write_neo4j_cypher"]
                .into_iter()
                .map(|name| Capability {
                    name: name.into(),
                    description: Some(format!("{name} first line\nsecond line")),
                })
                .collect())
        }

        async fn invoke_capability(
            &mut self,
            name: &str,
            arguments: serde_json::Value,
        ) -> Result<CapabilityResult, ProbeError> {
            assert_eq!(name, SCHEMA_TOOL);
            assert_eq!(arguments, serde_json::json!({}));
            self.step("invoke")?;
            Ok(CapabilityResult {
                content: self
                    .schema_text
                    .map(|t| ContentBlock {
                        kind: "text".into(),
                        text: Some(t.into()),
                    })
                    .into_iter()
                    .collect(),
                is_error: false,
            })
        }

        async fn close(&mut self) {
            self.calls.push("close".into());
        }
    }

    #[tokio::test]
    async fn summarizes_one_node_and_one_relationship() {
        let mut session = FakeSession {
            schema_text: Some(SCHEMA),
            ..Default::default()
        };
        let mut out = Vec::new();
        let report = ProbeRunner::new(&mut session, &mut out).run().await.unwrap();

        assert_eq!(report.capabilities.len(), 3);
        let schema = report.schema.unwrap();
        assert_eq!(schema.nodes.len(), 1);
        assert_eq!(schema.relationships.len(), 1);
        assert_eq!(schema.nodes[0].count.as_deref(), Some("5"));
        assert_eq!(schema.relationships[0].count.as_deref(), Some("2"));
        assert_eq!(session.calls, ["connect", "ping", "list", "invoke", "close"]);

        let printed = String::from_utf8(out).unwrap();
        assert!(printed.contains("1. get_neo4j_schema\n   get_neo4j_schema first line\n"));
        assert!(!printed.contains("second line"));
        assert!(printed.contains("Result type: text"));
        assert!(printed.contains("  - Person: 1 properties, 5 nodes"));
        assert!(printed.contains("  - KNOWS: 0 properties, 2 relationships"));
    }

    #[tokio::test]
    async fn failure_reports_stage_and_still_closes() {
        let mut session = FakeSession {
            fail_on: Some("list"),
            schema_text: Some(SCHEMA),
            ..Default::default()
        };
        let mut out = Vec::new();
        let err = ProbeRunner::new(&mut session, &mut out).run().await.unwrap_err();

        assert_eq!(err.stage, ProbeStage::Listing);
        assert!(err.to_string().starts_with("list tools failed"));
        assert_eq!(session.calls, ["connect", "ping", "list", "close"]);
    }

    #[tokio::test]
    async fn bad_schema_text_fails_in_summarizing() {
        let mut session = FakeSession {
            schema_text: Some("not json"),
            ..Default::default()
        };
        let mut out = Vec::new();
        let err = ProbeRunner::new(&mut session, &mut out).run().await.unwrap_err();
        assert_eq!(err.stage, ProbeStage::Summarizing);
        assert!(matches!(err.source, ProbeError::Decode(_)));
    }

    #[tokio::test]
    async fn empty_result_skips_summary() {
        let mut session = FakeSession::default();
        let mut out = Vec::new();
        let report = ProbeRunner::new(&mut session, &mut out).run().await.unwrap();
        assert_eq!(report.result_kind, None);
        assert_eq!(report.schema, None);
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        assert_eq!(
            load_api_key(&path, |_| Some("from-env".into())).unwrap(),
            ApiKeyLookup::FileMissing(path)
        );
    }

    #[test]
    fn key_comes_from_file_then_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");

        std::fs::write(&path, "NEO4J_API_KEY=file-key\n").unwrap();
        assert_eq!(
            load_api_key(&path, |_| Some("env-key".into())).unwrap(),
            ApiKeyLookup::Found("file-key".into())
        );

        std::fs::write(&path, "NEO4J_URI=bolt://x\n").unwrap();
        assert_eq!(
            load_api_key(&path, |_| Some("env-key".into())).unwrap(),
            ApiKeyLookup::Found("env-key".into())
        );
        assert_eq!(
            load_api_key(&path, |_| None).unwrap(),
            ApiKeyLookup::KeyMissing(path.clone())
        );
    }

    #[test]
    fn preview_truncates() {
        assert_eq!(key_preview("abcdefghijklmnopqrstuvwxyz"), "abcdefghijklmnop...");
        assert_eq!(key_preview("short"), "short...");
    }
}
