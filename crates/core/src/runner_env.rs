//! Job-runner environment
//!
//! Values the surrounding CI job exposes to this process: debug mode, temp
//! directory, config-home overrides, and the workflow-command conventions for
//! collapsible log groups and PATH additions.

use crate::errors::{Result, ToolchainError};
use crate::mode::ExecutionMode;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Resolved job-runner environment
#[derive(Debug, Clone, Default)]
pub struct RunnerEnv {
    /// `RUNNER_DEBUG=1`
    pub debug: bool,
    /// Scratch directory for generated files
    pub temp_dir: PathBuf,
    /// `DOCKER_CONFIG` override
    pub docker_config: Option<PathBuf>,
    /// `BUILDX_CONFIG` override, honoured only in standalone mode
    pub buildx_config: Option<PathBuf>,
    /// User home directory
    pub home_dir: Option<PathBuf>,
    /// `GITHUB_PATH` file for PATH additions visible to later job steps
    pub path_file: Option<PathBuf>,
}

impl RunnerEnv {
    /// Read the environment of the current process
    pub fn from_env() -> Self {
        let non_empty = |key: &str| {
            std::env::var_os(key)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
        };

        Self {
            debug: std::env::var("RUNNER_DEBUG").map(|v| v == "1").unwrap_or(false),
            temp_dir: non_empty("RUNNER_TEMP").unwrap_or_else(std::env::temp_dir),
            docker_config: non_empty("DOCKER_CONFIG"),
            buildx_config: non_empty("BUILDX_CONFIG"),
            home_dir: directories_next::BaseDirs::new().map(|d| d.home_dir().to_path_buf()),
            path_file: non_empty("GITHUB_PATH"),
        }
    }

    /// Host-engine config home: `DOCKER_CONFIG` or `~/.docker`
    pub fn engine_config_home(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.docker_config {
            return Ok(dir.clone());
        }
        self.home_dir
            .as_ref()
            .map(|home| home.join(".docker"))
            .ok_or_else(|| ToolchainError::NoHomeDirectory.into())
    }

    /// Builder-tool config home for the given mode
    pub fn tool_config_home(&self, mode: ExecutionMode) -> Result<PathBuf> {
        if mode.is_standalone() {
            if let Some(dir) = &self.buildx_config {
                return Ok(dir.clone());
            }
        }
        Ok(self.engine_config_home()?.join("buildx"))
    }

    /// Credentials directory scoped to one builder identity
    pub fn credentials_dir(&self, mode: ExecutionMode, identity: &str) -> Result<PathBuf> {
        Ok(self.tool_config_home(mode)?.join("certs").join(identity))
    }

    /// Make `dir` visible on PATH to this process and to later job steps
    pub fn add_path(&self, dir: &Path) -> Result<()> {
        let current = std::env::var_os("PATH").unwrap_or_default();
        let mut paths = vec![dir.to_path_buf()];
        paths.extend(std::env::split_paths(&current));
        if let Ok(joined) = std::env::join_paths(paths) {
            std::env::set_var("PATH", joined);
        }

        if let Some(path_file) = &self.path_file {
            let mut file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path_file)?;
            writeln!(file, "{}", dir.display())?;
        }
        debug!("Added {} to PATH", dir.display());
        Ok(())
    }
}

/// Collapsible log section; closed when dropped
#[must_use = "the group closes as soon as it is dropped"]
pub struct LogGroup {
    _private: (),
}

impl LogGroup {
    /// Open a log group with the given title
    pub fn start(title: &str) -> Self {
        println!("::group::{}", title);
        Self { _private: () }
    }
}

impl Drop for LogGroup {
    fn drop(&mut self) {
        println!("::endgroup::");
    }
}

/// Render one entry for a job-runner file command (`GITHUB_STATE`, `GITHUB_OUTPUT`)
///
/// Uses the multi-line delimiter form so values may contain newlines.
pub(crate) fn file_command_entry(key: &str, value: &str) -> String {
    let delimiter = format!("ghadelimiter_{}", uuid::Uuid::new_v4());
    format!("{key}<<{delimiter}\n{value}\n{delimiter}\n")
}

/// Append one entry to a job-runner command file
pub(crate) fn append_file_command(path: &Path, key: &str, value: &str) -> std::io::Result<()> {
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    file.write_all(file_command_entry(key, value).as_bytes())
}
