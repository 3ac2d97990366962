//! Cleanup sequence
//!
//! Reads only [`CrossPhaseState`] and runs three independent, order-fixed
//! steps: container log capture, instance removal, credentials removal.
//! Nothing here returns an error; failures become [`Diagnostic`] entries and
//! warnings, and the remaining steps still run.

use crate::command::{command_for, ToolCommand};
use crate::exec::CommandRunner;
use crate::runner_env::LogGroup;
use crate::state::CrossPhaseState;
use std::fmt;
use tracing::{info, instrument, warn};

/// One teardown step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupStep {
    ContainerLogs,
    RemoveBuilder,
    RemoveCredentials,
}

impl fmt::Display for CleanupStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CleanupStep::ContainerLogs => "container-logs",
            CleanupStep::RemoveBuilder => "remove-builder",
            CleanupStep::RemoveCredentials => "remove-credentials",
        };
        f.write_str(name)
    }
}

/// A non-fatal cleanup failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub step: CleanupStep,
    pub message: String,
}

/// What cleanup attempted and what went wrong
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Steps that performed an external action, in order
    pub actions: Vec<CleanupStep>,
    /// Failures, downgraded to warnings
    pub diagnostics: Vec<Diagnostic>,
}

impl CleanupReport {
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }

    fn warn(&mut self, step: CleanupStep, message: String) {
        warn!("{}: {}", step, message);
        self.diagnostics.push(Diagnostic { step, message });
    }
}

/// Run the cleanup sequence against recorded state
#[instrument(skip_all)]
pub async fn run_cleanup<R: CommandRunner>(runner: &R, state: &CrossPhaseState) -> CleanupReport {
    let mut report = CleanupReport::default();
    let mode = state.mode();

    if state.debug {
        if let Some(container) = &state.container_name {
            let _group = LogGroup::start(&format!("BuildKit container logs ({})", container));
            report.actions.push(CleanupStep::ContainerLogs);
            let command = ToolCommand::engine(["logs", container.as_str()]);
            match runner.output(&command).await {
                Ok(output) => {
                    for line in output.stdout.lines().chain(output.stderr.lines()) {
                        info!("{}", line);
                    }
                    if !output.success() {
                        report.warn(
                            CleanupStep::ContainerLogs,
                            format!("`{}` exited with code {}", command, output.exit_code),
                        );
                    }
                }
                Err(e) => report.warn(CleanupStep::ContainerLogs, e.to_string()),
            }
        }
    }

    if !state.cleanup {
        info!("Builder cleanup disabled; leaving builder and credentials in place");
        return report;
    }

    if let Some(name) = &state.builder_name {
        let _group = LogGroup::start("Removing builder");
        report.actions.push(CleanupStep::RemoveBuilder);
        let command = command_for(["rm", name.as_str()], mode);
        match runner.run(&command).await {
            Ok(_) => info!("Removed builder {}", name),
            Err(e) => report.warn(CleanupStep::RemoveBuilder, e.to_string()),
        }
    }

    if let Some(dir) = &state.credentials_dir {
        if tokio::fs::try_exists(dir).await.unwrap_or(false) {
            report.actions.push(CleanupStep::RemoveCredentials);
            match tokio::fs::remove_dir_all(dir).await {
                Ok(()) => info!("Removed credentials directory {}", dir.display()),
                Err(e) => report.warn(
                    CleanupStep::RemoveCredentials,
                    format!("{}: {}", dir.display(), e),
                ),
            }
        }
    }

    report
}
