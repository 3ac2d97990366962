//! External command execution
//!
//! [`CommandRunner`] is the seam between lifecycle logic and real processes.
//! `CliRunner` spawns processes; [`crate::mock::MockRunner`] records and
//! scripts them for tests.

use crate::command::ToolCommand;
use crate::errors::{CommandError, Result};
use std::process::Command;
use tracing::{debug, instrument};

/// Captured result of a finished command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOutput {
    /// Exit code of the process (-1 when terminated by a signal)
    pub exit_code: i32,
    /// Standard output from the command
    pub stdout: String,
    /// Standard error from the command
    pub stderr: String,
}

impl ExecOutput {
    /// Build a successful output with the given stdout
    pub fn ok<S: Into<String>>(stdout: S) -> Self {
        Self {
            exit_code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Build a failed output with the given exit code and stderr
    pub fn failed<S: Into<String>>(exit_code: i32, stderr: S) -> Self {
        Self {
            exit_code,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Convert a non-zero exit into [`CommandError::Failed`]
    pub fn check(self, command: &ToolCommand) -> Result<Self> {
        if self.success() {
            Ok(self)
        } else {
            Err(CommandError::Failed {
                command: command.to_string(),
                code: self.exit_code,
                stderr: self.stderr.trim().to_string(),
            }
            .into())
        }
    }
}

/// Executes commands to completion, one at a time
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Run a command and capture its output. A non-zero exit is returned as
    /// data, not as an error; only failing to start the program is an error.
    async fn output(&self, command: &ToolCommand) -> Result<ExecOutput>;

    /// Run a command and treat a non-zero exit as [`CommandError::Failed`]
    async fn run(&self, command: &ToolCommand) -> Result<ExecOutput> {
        self.output(command).await?.check(command)
    }
}

impl<T: CommandRunner> CommandRunner for &T {
    async fn output(&self, command: &ToolCommand) -> Result<ExecOutput> {
        (*self).output(command).await
    }
}

/// Process-spawning runner
#[derive(Debug, Clone, Default)]
pub struct CliRunner;

impl CliRunner {
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for CliRunner {
    #[instrument(skip(self, command), fields(command = %command))]
    async fn output(&self, command: &ToolCommand) -> Result<ExecOutput> {
        debug!("Executing command");

        let program = command.program.clone();
        let args = command.args.clone();

        tokio::task::spawn_blocking(move || -> std::result::Result<ExecOutput, CommandError> {
            let output = Command::new(&program)
                .args(&args)
                .output()
                .map_err(|e| CommandError::Spawn {
                    program: program.clone(),
                    message: e.to_string(),
                })?;

            Ok(ExecOutput {
                exit_code: output.status.code().unwrap_or(-1),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            })
        })
        .await
        .map_err(|e| CommandError::Join(e.to_string()))?
        .map_err(Into::into)
    }
}
