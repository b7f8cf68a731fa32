use tokio::process::Command;

use cypher_harness_core::error::{HarnessError, HarnessResult};
use cypher_harness_core::{ConnectionConfig, Settings};

use crate::foreground::{run_foreground, LaunchOutcome};
use crate::shutdown::ShutdownSignal;

const UV_HINT: &str = "Please install uv: https://docs.astral.sh/uv/getting-started/installation/";

/// Server command with the inherited environment plus the config overlay.
pub fn local_command(config: &ConnectionConfig, settings: &Settings) -> HarnessResult<Command> {
    let (program, args) = settings.server_command.split_first().ok_or_else(|| {
        HarnessError::Other(anyhow::anyhow!("Server command is empty"))
    })?;

    let mut cmd = Command::new(program);
    cmd.args(args)
        .current_dir(&settings.project_dir)
        .envs(config.env_overlay());
    Ok(cmd)
}

/// Run the server in the foreground until it exits or `shutdown` fires.
pub async fn run_local(
    config: &ConnectionConfig,
    settings: &Settings,
    shutdown: ShutdownSignal,
) -> HarnessResult<LaunchOutcome> {
    let cmd = local_command(config, settings)?;
    tracing::info!(
        command = ?settings.server_command,
        cwd = %settings.project_dir.display(),
        "Starting local MCP server"
    );
    run_foreground(cmd, "MCP server", UV_HINT, shutdown).await
}
