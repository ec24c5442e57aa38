//! External command invocation: run a program, get exit status plus captured
//! stdout/stderr. Everything else in the daemon treats commands through this
//! surface so a hung tool can never stall the sampling loops.

use std::time::Duration;

use tracing::*;

/// Captured output of a finished command.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Failed to spawn {program:?}: {reason}")]
    Spawn { program: String, reason: String },

    #[error("{program:?} exited with status {status}: {stderr}")]
    Failed {
        program: String,
        status: i32,
        stderr: String,
    },

    #[error("{program:?} did not finish within {timeout:?}")]
    TimedOut { program: String, timeout: Duration },
}

/// Run a command to completion, treating a zero exit status as success.
pub async fn run(program: &str, args: &[&str]) -> Result<CommandOutput, CommandError> {
    debug!("Running command: {program} {args:?}");

    let output = tokio::process::Command::new(program)
        .args(args)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|error| CommandError::Spawn {
            program: program.to_string(),
            reason: error.to_string(),
        })?;

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    if !output.status.success() {
        return Err(CommandError::Failed {
            program: program.to_string(),
            status: output.status.code().unwrap_or(-1),
            stderr,
        });
    }

    Ok(CommandOutput { stdout, stderr })
}

/// Run a command with a deadline. Used only by the boot-time queries, which
/// are allowed to block their caller for a bounded interval.
pub async fn run_with_timeout(
    program: &str,
    args: &[&str],
    timeout: Duration,
) -> Result<CommandOutput, CommandError> {
    match tokio::time::timeout(timeout, run(program, args)).await {
        Ok(result) => result,
        Err(_) => Err(CommandError::TimedOut {
            program: program.to_string(),
            timeout,
        }),
    }
}
