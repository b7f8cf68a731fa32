use std::process::ExitStatus;

use tokio::process::Command;

use cypher_harness_core::error::{HarnessError, HarnessResult};

use crate::shutdown::ShutdownSignal;

/// How a foreground child ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchOutcome {
    /// Child exited with status 0.
    Exited,
    /// Interrupt received; the child was stopped.
    Interrupted,
}

/// Spawn `cmd` with inherited stdio and wait for it, or for `shutdown`.
///
/// A missing program maps to [`HarnessError::ToolMissing`] carrying `hint`;
/// a non-zero exit maps to [`HarnessError::ChildFailed`] named `step`.
pub async fn run_foreground(
    mut cmd: Command,
    step: &str,
    hint: &'static str,
    mut shutdown: ShutdownSignal,
) -> HarnessResult<LaunchOutcome> {
    let program = cmd.as_std().get_program().to_string_lossy().into_owned();
    cmd.kill_on_drop(true);

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(HarnessError::ToolMissing { tool: program, hint });
        }
        Err(e) => {
            return Err(HarnessError::Other(anyhow::anyhow!(
                "Failed to spawn {program}: {e}"
            )))
        }
    };
    tracing::info!(step, program = %program, pid = ?child.id(), "Spawned child process");

    tokio::select! {
        biased;
        _ = shutdown.cancelled() => {
            tracing::info!(step, "Stopping child process");
            if let Err(e) = child.kill().await {
                tracing::warn!(step, error = %e, "Failed to kill child process");
            }
            Ok(LaunchOutcome::Interrupted)
        }
        status = child.wait() => {
            let status = status.map_err(|e| {
                HarnessError::Other(anyhow::anyhow!("Failed to wait for {program}: {e}"))
            })?;
            tracing::info!(step, status = %status, "Child process exited");
            if status.success() {
                Ok(LaunchOutcome::Exited)
            } else if shutdown.is_cancelled() || interrupted_by_signal(&status) {
                // Ctrl+C reaches the whole foreground process group, so the
                // child may die before our own listener fires.
                Ok(LaunchOutcome::Interrupted)
            } else {
                Err(HarnessError::ChildFailed {
                    step: step.to_string(),
                    code: status.code().unwrap_or(1),
                })
            }
        }
    }
}

#[cfg(unix)]
fn interrupted_by_signal(status: &ExitStatus) -> bool {
    use std::os::unix::process::ExitStatusExt;
    // SIGINT
    status.signal() == Some(2)
}

#[cfg(not(unix))]
fn interrupted_by_signal(_status: &ExitStatus) -> bool {
    false
}
