use std::path::PathBuf;

pub const ENV_PROJECT_DIR: &str = "NEO4J_MCP_PROJECT_DIR";
pub const ENV_ENV_FILE: &str = "NEO4J_MCP_ENV_FILE";
pub const ENV_SERVER_CMD: &str = "NEO4J_MCP_SERVER_CMD";
pub const ENV_DOCKER_IMAGE: &str = "NEO4J_MCP_DOCKER_IMAGE";
pub const ENV_CONTAINER_RUNTIME: &str = "NEO4J_MCP_CONTAINER_RUNTIME";
pub const ENV_PROBE_IMAGE: &str = "NEO4J_MCP_PROBE_IMAGE";
pub const ENV_PROBE_CONTEXT: &str = "NEO4J_MCP_PROBE_CONTEXT";

/// Dockerfile for the probe image, relative to the probe build context.
pub const PROBE_DOCKERFILE: &str = "Dockerfile.probe";

// Workspace root of this build; holds `Dockerfile.probe`.
const WORKSPACE_ROOT: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../..");

/// Where things live and which commands to run. Resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Server project root: working directory for `uv run` and the docker
    /// build context.
    pub project_dir: PathBuf,
    pub env_file: PathBuf,
    /// Local server command, program first.
    pub server_command: Vec<String>,
    pub docker_image: String,
    pub container_runtime: String,
    /// Tag of the image `--docker` probes are built into and run from.
    pub probe_image: String,
    /// Build context for the probe image: a checkout of this workspace.
    pub probe_context: PathBuf,
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve settings through `lookup`; unset or blank values fall back to
    /// the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let project_dir = get(ENV_PROJECT_DIR)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        let env_file = get(ENV_ENV_FILE)
            .map(PathBuf::from)
            .unwrap_or_else(|| project_dir.join("test_api").join(".env"));
        let server_command = get(ENV_SERVER_CMD)
            .map(|cmd| cmd.split_whitespace().map(str::to_string).collect())
            .unwrap_or_else(|| {
                vec!["uv".into(), "run".into(), "mcp-neo4j-cypher".into()]
            });

        Self {
            project_dir,
            env_file,
            server_command,
            docker_image: get(ENV_DOCKER_IMAGE)
                .unwrap_or_else(|| "mcp-neo4j-cypher:dev-latest".to_string()),
            container_runtime: get(ENV_CONTAINER_RUNTIME).unwrap_or_else(|| "docker".to_string()),
            probe_image: get(ENV_PROBE_IMAGE)
                .unwrap_or_else(|| "cypher-test-auth:dev-latest".to_string()),
            probe_context: get(ENV_PROBE_CONTEXT)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(WORKSPACE_ROOT)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults() {
        let s = Settings::from_lookup(|_| None);
        assert_eq!(s.project_dir, PathBuf::from("."));
        assert_eq!(s.env_file, PathBuf::from("./test_api/.env"));
        assert_eq!(s.server_command, ["uv", "run", "mcp-neo4j-cypher"]);
        assert_eq!(s.docker_image, "mcp-neo4j-cypher:dev-latest");
        assert_eq!(s.container_runtime, "docker");
        assert_eq!(s.probe_image, "cypher-test-auth:dev-latest");
    }

    #[test]
    fn default_probe_context_holds_the_probe_dockerfile() {
        let s = Settings::from_lookup(|_| None);
        assert!(s.probe_context.join(PROBE_DOCKERFILE).is_file());
    }

    #[test]
    fn overrides() {
        let vars: HashMap<&str, &str> = [
            (ENV_PROJECT_DIR, "/srv/cypher"),
            (ENV_SERVER_CMD, "python -m mcp_neo4j_cypher"),
            (ENV_CONTAINER_RUNTIME, "  "),
            (ENV_PROBE_CONTEXT, "/src/cypher-harness"),
        ]
        .into_iter()
        .collect();
        let s = Settings::from_lookup(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(s.env_file, PathBuf::from("/srv/cypher/test_api/.env"));
        assert_eq!(s.server_command, ["python", "-m", "mcp_neo4j_cypher"]);
        assert_eq!(s.container_runtime, "docker");
        assert_eq!(s.probe_context, PathBuf::from("/src/cypher-harness"));
    }
}
