// Process execution seam for ping and allow-listed commands

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::DiagnosticError;

#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
}

/// Seam between the diagnostic operations and the OS. Tests substitute a
/// double here to assert that rejected requests never spawn anything.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<CommandOutput, DiagnosticError>;
}

/// Runs the literal argv via tokio::process, never through a shell.
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<CommandOutput, DiagnosticError> {
        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // Dropping the timed-out future must reap the subprocess.
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| DiagnosticError::ConnectError(format!("spawn {}: {}", program, e)))?;

        match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Err(_) => Err(DiagnosticError::Timeout(timeout)),
            Ok(Err(e)) => Err(DiagnosticError::ConnectError(format!(
                "{} failed: {}",
                program, e
            ))),
            Ok(Ok(output)) => Ok(CommandOutput {
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                exit_code: output.status.code(),
            }),
        }
    }
}
