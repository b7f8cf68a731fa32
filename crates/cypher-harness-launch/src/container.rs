use std::path::Path;

use tokio::process::Command;

use cypher_harness_core::config::{
    NEO4J_API_KEY, NEO4J_DATABASE, NEO4J_MCP_SERVER_HOST, NEO4J_MCP_SERVER_PATH,
    NEO4J_MCP_SERVER_PORT, NEO4J_PASSWORD, NEO4J_TRANSPORT, NEO4J_URI, NEO4J_USERNAME,
};
use cypher_harness_core::error::HarnessResult;
use cypher_harness_core::settings::{ENV_ENV_FILE, PROBE_DOCKERFILE};
use cypher_harness_core::{ConnectionConfig, Settings};

use crate::foreground::{run_foreground, LaunchOutcome};
use crate::shutdown::ShutdownSignal;

/// Hostname a container uses to reach the host's loopback services.
pub const CONTAINER_HOST_ALIAS: &str = "host.docker.internal";

/// Bind address inside the container.
pub const CONTAINER_BIND_HOST: &str = "0.0.0.0";

pub const DOCKER_HINT: &str = "Please install Docker: https://docs.docker.com/get-docker/";

const LOOPBACK_HOSTS: [&str; 2] = ["localhost", "127.0.0.1"];

/// Rewrite loopback hosts in `uri` to [`CONTAINER_HOST_ALIAS`]. Returns
/// `None` when the URI has no loopback reference.
pub fn rewrite_loopback(uri: &str) -> Option<String> {
    if !LOOPBACK_HOSTS.iter().any(|h| uri.contains(h)) {
        return None;
    }
    Some(
        LOOPBACK_HOSTS
            .iter()
            .fold(uri.to_string(), |acc, h| acc.replace(h, CONTAINER_HOST_ALIAS)),
    )
}

/// Everything needed to `docker run` the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerRun {
    /// Arguments after the runtime program, starting with `run`.
    pub args: Vec<String>,
    /// Set when the datastore URI was rewritten for the container.
    pub rewritten_uri: Option<String>,
    /// URL clients on the host should use.
    pub advertised_url: String,
}

impl ContainerRun {
    pub fn plan(config: &ConnectionConfig, settings: &Settings) -> Self {
        let rewritten_uri = rewrite_loopback(&config.uri);
        let uri = rewritten_uri.as_deref().unwrap_or(&config.uri);
        let port = &config.port;

        let bindings = [
            (NEO4J_URI, uri),
            (NEO4J_USERNAME, config.username.as_str()),
            (NEO4J_PASSWORD, config.password.as_str()),
            (NEO4J_DATABASE, config.database.as_str()),
            (NEO4J_TRANSPORT, "http"),
            (NEO4J_MCP_SERVER_HOST, CONTAINER_BIND_HOST),
            (NEO4J_MCP_SERVER_PORT, port.as_str()),
            (NEO4J_MCP_SERVER_PATH, config.path.as_str()),
            (NEO4J_API_KEY, config.api_key.as_str()),
        ];

        let mut args: Vec<String> = vec![
            "run".into(),
            "--rm".into(),
            "-p".into(),
            format!("{port}:{port}"),
        ];
        for (key, value) in bindings {
            args.push("-e".into());
            args.push(format!("{key}={value}"));
        }
        args.push(settings.docker_image.clone());

        Self {
            args,
            rewritten_uri,
            advertised_url: format!("http://127.0.0.1:{port}{}", config.path),
        }
    }

    pub fn command(&self, settings: &Settings) -> Command {
        let mut cmd = Command::new(&settings.container_runtime);
        cmd.args(&self.args);
        cmd
    }
}

/// `docker run` for the auth probe: the probe image shares the host network
/// and sees the env file's directory at `/app`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeContainerRun {
    pub args: Vec<String>,
}

impl ProbeContainerRun {
    /// `env_file` should be absolute; docker rejects relative bind mounts.
    pub fn plan(api_key: &str, env_file: &Path, settings: &Settings) -> Self {
        let env_dir = env_file
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let file_name = env_file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| ".env".to_string());

        let args = vec![
            "run".to_string(),
            "--rm".into(),
            "-i".into(),
            "--network=host".into(),
            "-v".into(),
            format!("{}:/app", env_dir.display()),
            "-w".into(),
            "/app".into(),
            "-e".into(),
            format!("{NEO4J_API_KEY}={api_key}"),
            "-e".into(),
            format!("{ENV_ENV_FILE}=/app/{file_name}"),
            settings.probe_image.clone(),
        ];
        Self { args }
    }

    pub fn command(&self, settings: &Settings) -> Command {
        let mut cmd = Command::new(&settings.container_runtime);
        cmd.args(&self.args);
        cmd
    }
}

/// `docker build` of the probe image from a checkout of this workspace.
pub fn probe_build_command(settings: &Settings) -> Command {
    let context = &settings.probe_context;
    let mut cmd = Command::new(&settings.container_runtime);
    cmd.arg("build")
        .arg("-f")
        .arg(context.join(PROBE_DOCKERFILE))
        .args(["-t", settings.probe_image.as_str()])
        .arg(context);
    cmd
}

pub async fn build_probe_image(
    settings: &Settings,
    shutdown: ShutdownSignal,
) -> HarnessResult<LaunchOutcome> {
    tracing::info!(
        image = %settings.probe_image,
        context = %settings.probe_context.display(),
        "Building probe image"
    );
    run_foreground(probe_build_command(settings), "docker build", DOCKER_HINT, shutdown).await
}

pub async fn run_probe_container(
    run: &ProbeContainerRun,
    settings: &Settings,
    shutdown: ShutdownSignal,
) -> HarnessResult<LaunchOutcome> {
    tracing::info!(image = %settings.probe_image, "Running probe in container");
    run_foreground(run.command(settings), "docker run", DOCKER_HINT, shutdown).await
}

pub fn build_command(settings: &Settings) -> Command {
    let mut cmd = Command::new(&settings.container_runtime);
    cmd.args(["build", "-t", settings.docker_image.as_str(), "."])
        .current_dir(&settings.project_dir);
    cmd
}

/// Build the server image from the project tree.
pub async fn build_image(
    settings: &Settings,
    shutdown: ShutdownSignal,
) -> HarnessResult<LaunchOutcome> {
    tracing::info!(
        image = %settings.docker_image,
        context = %settings.project_dir.display(),
        "Building container image"
    );
    run_foreground(build_command(settings), "docker build", DOCKER_HINT, shutdown).await
}

pub async fn run_container(
    run: &ContainerRun,
    settings: &Settings,
    shutdown: ShutdownSignal,
) -> HarnessResult<LaunchOutcome> {
    tracing::info!(image = %settings.docker_image, url = %run.advertised_url, "Running container");
    run_foreground(run.command(settings), "docker run", DOCKER_HINT, shutdown).await
}
