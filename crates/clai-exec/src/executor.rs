use std::process::Command;
use std::process::Output;
use std::process::Stdio;

use crate::contracts::ShellRunner;
use crate::error::ExecError;

/// Runs commands through `<program> -c <command>`.
#[derive(Debug, Clone)]
pub struct ShellExecutor {
    program: String,
}

impl ShellExecutor {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl ShellRunner for ShellExecutor {
    fn run(&self, command: &str) -> Result<String, ExecError> {
        tracing::info!(shell = %self.program, command, "running command");
        let output = Command::new(&self.program)
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| ExecError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if output.status.success() {
            return Ok(stdout_text(&output));
        }

        let stderr = stderr_text(&output);
        let message = if stderr.trim().is_empty() {
            format!("{} exited with {}", self.program, output.status)
        } else {
            stderr.trim_end().to_string()
        };
        tracing::warn!(status = %output.status, "command failed");
        Err(ExecError::CommandFailed(message))
    }
}

fn stdout_text(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr_text(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}
