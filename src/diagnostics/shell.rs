// Fixed allow-listed command execution

use std::time::Duration;

use crate::error::DiagnosticError;
use crate::models::{DiagnosticOutcome, DiagnosticResult};
use crate::validate::AllowedCommand;

use super::runner::CommandRunner;

/// Runs the resolved allow-list entry and captures both streams. The
/// result reports failure when the process exited non-zero or wrote to
/// stderr, but stdout and stderr are returned either way.
pub async fn run_command(
    runner: &dyn CommandRunner,
    command: &AllowedCommand,
    timeout: Duration,
) -> Result<DiagnosticResult, DiagnosticError> {
    let output = runner.run(command.program, command.args, timeout).await?;

    let clean_exit = output.exit_code == Some(0);
    let stderr_empty = output.stderr.trim().is_empty();
    let outcome = DiagnosticOutcome::ShellCommand {
        command: command.command_line(),
        stdout: output.stdout,
        stderr: output.stderr.clone(),
        exit_code: output.exit_code,
    };

    if clean_exit && stderr_empty {
        Ok(DiagnosticResult::ok(outcome))
    } else {
        let error = if !stderr_empty {
            output.stderr.trim().to_string()
        } else {
            match output.exit_code {
                Some(code) => format!("exited with code {}", code),
                None => "terminated by signal".to_string(),
            }
        };
        Ok(DiagnosticResult::failed(outcome, error))
    }
}
