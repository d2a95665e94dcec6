use std::process::ExitStatus;

use tokio::process::Command;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::CommitError;

/// Runs `command` through `/bin/sh -c` and waits for it.
///
/// Only the exit status is interpreted; output is logged.
pub async fn run_command(command: &str) -> Result<ExitStatus, CommitError> {
    info!("execute command {command}");
    let output = Command::new("/bin/sh")
        .arg("-c")
        .arg(command)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|source| CommitError::CommandSpawn {
            command: command.to_string(),
            source,
        })?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    if output.status.success() {
        debug!("command {command} succeeded: {stdout}{stderr}");
    } else {
        warn!("command {command} exited with {}: {stdout}{stderr}", output.status);
    }
    Ok(output.status)
}
