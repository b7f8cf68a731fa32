use std::fmt::Write as _;
use std::path::Path;

use crate::credential::generate_api_key;
use crate::env_file::{quote_value, EnvFile};
use crate::error::{HarnessError, HarnessResult};

pub const NEO4J_URI: &str = "NEO4J_URI";
pub const NEO4J_USERNAME: &str = "NEO4J_USERNAME";
pub const NEO4J_PASSWORD: &str = "NEO4J_PASSWORD";
pub const NEO4J_DATABASE: &str = "NEO4J_DATABASE";
pub const NEO4J_TRANSPORT: &str = "NEO4J_TRANSPORT";
pub const NEO4J_MCP_SERVER_HOST: &str = "NEO4J_MCP_SERVER_HOST";
pub const NEO4J_MCP_SERVER_PORT: &str = "NEO4J_MCP_SERVER_PORT";
pub const NEO4J_MCP_SERVER_PATH: &str = "NEO4J_MCP_SERVER_PATH";
pub const NEO4J_API_KEY: &str = "NEO4J_API_KEY";

/// Keys that must be present in the prior file before provisioning.
pub const REQUIRED_KEYS: [&str; 3] = [NEO4J_URI, NEO4J_USERNAME, NEO4J_PASSWORD];

fn default_database() -> String {
    "neo4j".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> String {
    "8001".to_string()
}

fn default_path() -> String {
    "/mcp/".to_string()
}

/// Everything the server needs to start, built once per provisioning run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub uri: String,
    pub username: String,
    pub password: String,
    pub database: String,
    pub transport: String,
    pub host: String,
    pub port: String,
    pub path: String,
    pub api_key: String,
}

impl ConnectionConfig {
    /// Merge the prior file's connection info with a new API key. Whatever
    /// key the prior file held is discarded.
    pub fn merge(prior: &EnvFile, source: &Path, api_key: String) -> HarnessResult<Self> {
        let missing: Vec<&'static str> = REQUIRED_KEYS
            .iter()
            .copied()
            .filter(|k| prior.get(k).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(HarnessError::MissingFields {
                path: source.to_path_buf(),
                keys: missing,
            });
        }

        let take = |key: &str| prior.get(key).map(str::to_string);
        Ok(Self {
            uri: take(NEO4J_URI).unwrap_or_default(),
            username: take(NEO4J_USERNAME).unwrap_or_default(),
            password: take(NEO4J_PASSWORD).unwrap_or_default(),
            database: take(NEO4J_DATABASE).unwrap_or_else(default_database),
            transport: "http".to_string(),
            host: take(NEO4J_MCP_SERVER_HOST).unwrap_or_else(default_host),
            port: take(NEO4J_MCP_SERVER_PORT).unwrap_or_else(default_port),
            path: take(NEO4J_MCP_SERVER_PATH).unwrap_or_else(default_path),
            api_key,
        })
    }

    /// All entries in file order, as `(key, value)`.
    pub fn entries(&self) -> [(&'static str, &str); 9] {
        [
            (NEO4J_URI, self.uri.as_str()),
            (NEO4J_USERNAME, self.username.as_str()),
            (NEO4J_PASSWORD, self.password.as_str()),
            (NEO4J_DATABASE, self.database.as_str()),
            (NEO4J_TRANSPORT, self.transport.as_str()),
            (NEO4J_MCP_SERVER_HOST, self.host.as_str()),
            (NEO4J_MCP_SERVER_PORT, self.port.as_str()),
            (NEO4J_MCP_SERVER_PATH, self.path.as_str()),
            (NEO4J_API_KEY, self.api_key.as_str()),
        ]
    }

    /// Entries to overlay onto a child environment. Empty values are skipped
    /// so they never clobber an inherited variable.
    pub fn env_overlay(&self) -> Vec<(&'static str, &str)> {
        self.entries()
            .into_iter()
            .filter(|(_, v)| !v.is_empty())
            .collect()
    }

    pub fn server_url(&self) -> String {
        format!("http://{}:{}{}", self.host, self.port, self.path)
    }

    /// Render the env file. Layout matches the `.env.sample` sections; values
    /// are quoted where needed so the file reads back unchanged.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let section = |out: &mut String, title: &str, keys: &[(&str, &str)]| {
            let _ = writeln!(out, "# {title}");
            for (k, v) in keys {
                let _ = writeln!(out, "{k}={}", quote_value(v));
            }
        };
        let entries = self.entries();
        section(&mut out, "Neo4j Connection", &entries[0..4]);
        out.push('\n');
        section(&mut out, "Server Configuration", &entries[4..8]);
        out.push('\n');
        section(&mut out, "API Key (generated for this server session)", &entries[8..]);
        out
    }

    /// Overwrite `path` with this configuration. Plain write: no lock, no
    /// rename, last writer wins.
    pub fn persist(&self, path: &Path) -> HarnessResult<()> {
        std::fs::write(path, self.render()).map_err(|source| HarnessError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!(path = %path.display(), "Persisted connection config with new API key");
        Ok(())
    }
}

/// Read the prior env file, mint a new API key and write the merged config
/// back. Nothing is written if the prior file is missing or incomplete.
pub fn provision(env_path: &Path) -> HarnessResult<ConnectionConfig> {
    let prior = EnvFile::from_file(env_path)?;
    let config = ConnectionConfig::merge(&prior, env_path, generate_api_key())?;
    config.persist(env_path)?;
    Ok(config)
}
