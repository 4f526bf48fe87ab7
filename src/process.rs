use std::path::Path;
use std::time::Duration;
use tracing::debug;

use crate::error::RunError;
use crate::util::{display_command, run_cmd_with_timeout};

/// Captured result of a finished child process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// `None` when the process was terminated by a signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// stdout followed by stderr
    pub fn combined(&self) -> String {
        match (self.stdout.is_empty(), self.stderr.is_empty()) {
            (_, true) => self.stdout.clone(),
            (true, false) => self.stderr.clone(),
            (false, false) => {
                let sep = if self.stdout.ends_with('\n') { "" } else { "\n" };
                format!("{}{}{}", self.stdout, sep, self.stderr)
            }
        }
    }

    pub fn status_label(&self) -> String {
        match self.exit_code {
            Some(code) => format!("status {}", code),
            None => "a signal".to_string(),
        }
    }
}

/// Capability to run an external command to completion.
pub trait ProcessRunner: Send + Sync {
    fn run(&self, program: &str, args: &[&str], cwd: &Path) -> Result<ProcessOutput, RunError>;
}

/// Runs real child processes with an overall timeout
pub struct SystemRunner {
    timeout: Duration,
}

impl SystemRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl ProcessRunner for SystemRunner {
    fn run(&self, program: &str, args: &[&str], cwd: &Path) -> Result<ProcessOutput, RunError> {
        let command = display_command(program, args);
        debug!("Running `{}` in {}", command, cwd.display());

        let output = run_cmd_with_timeout(program, args, cwd, self.timeout).map_err(|e| {
            RunError::Launch {
                command: command.clone(),
                reason: format!("{:#}", e),
            }
        })?;

        let output = ProcessOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        debug!("`{}` exited with {}", command, output.status_label());
        Ok(output)
    }
}
