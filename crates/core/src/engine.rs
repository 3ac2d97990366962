//! Host container engine integration
//!
//! Reachability probing decides the [`ExecutionMode`](crate::mode::ExecutionMode).
//! The remaining helpers are best-effort diagnostics issued directly against
//! the host engine CLI.

use crate::command::ToolCommand;
use crate::errors::{CommandError, Result};
use crate::exec::CommandRunner;
use tracing::{debug, info, instrument, warn};

/// Name prefix of the containers the isolated-container driver creates
pub const CONTAINER_PREFIX: &str = "buildx_buildkit";

/// Host-engine reachability probe
#[allow(async_fn_in_trait)]
pub trait HostEngine {
    /// Whether the host engine can be reached. Never fails; absence is `false`.
    async fn is_available(&self) -> bool;
}

impl<T: HostEngine> HostEngine for &T {
    async fn is_available(&self) -> bool {
        (*self).is_available().await
    }
}

/// Docker CLI probe
#[derive(Debug, Clone)]
pub struct DockerEngine<R> {
    runner: R,
}

impl<R: CommandRunner> DockerEngine<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }
}

impl<R: CommandRunner> HostEngine for DockerEngine<R> {
    #[instrument(skip(self))]
    async fn is_available(&self) -> bool {
        let command = ToolCommand::engine(["version", "--format", "json"]);
        match self.runner.output(&command).await {
            Ok(output) if output.success() => {
                debug!("Host engine is available");
                true
            }
            Ok(output) => {
                debug!("Host engine probe failed: {}", output.stderr.trim());
                false
            }
            Err(e) => {
                debug!("Host engine probe failed: {}", e);
                false
            }
        }
    }
}

/// Container name backing a node of an isolated-container builder
pub fn container_name_for(node_name: &str) -> String {
    format!("{}_{}", CONTAINER_PREFIX, node_name)
}

/// Log `docker version` and `docker info`; failures are logged and ignored
pub async fn log_engine_info<R: CommandRunner>(runner: &R) {
    for args in [["version"], ["info"]] {
        let command = ToolCommand::engine(args);
        match runner.output(&command).await {
            Ok(output) if output.success() => {
                for line in output.stdout.lines() {
                    info!("{}", line);
                }
            }
            Ok(output) => warn!("`{}` failed: {}", command, output.stderr.trim()),
            Err(e) => warn!("`{}` failed: {}", command, e),
        }
    }
}

/// BuildKit version running in a builder container, as `<image> => <version>`
#[instrument(skip(runner))]
pub async fn buildkit_version<R: CommandRunner>(runner: &R, container: &str) -> Result<String> {
    let inspect = ToolCommand::engine(["inspect", "--format", "{{.Config.Image}}", container]);
    let image = runner.run(&inspect).await?.stdout.trim().to_string();
    if image.is_empty() {
        return Err(CommandError::Failed {
            command: inspect.to_string(),
            code: 0,
            stderr: format!("no image reported for container {}", container),
        }
        .into());
    }

    let version_cmd = ToolCommand::engine(["run", "--rm", image.as_str(), "--version"]);
    let version = runner.run(&version_cmd).await?.stdout.trim().to_string();
    Ok(format!("{} => {}", image, version))
}
