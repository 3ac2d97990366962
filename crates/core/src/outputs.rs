//! Published outputs for the surrounding job

use crate::errors::{Result, StateError};
use crate::runner_env::append_file_command;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::debug;

/// Output names
pub mod names {
    pub const NAME: &str = "name";
    pub const DRIVER: &str = "driver";
    pub const PLATFORMS: &str = "platforms";
    pub const NODES: &str = "nodes";
    /// Deprecated: first node's endpoint, use `nodes`
    pub const ENDPOINT: &str = "endpoint";
    /// Deprecated: first node's status, use `nodes`
    pub const STATUS: &str = "status";
    /// Deprecated: first node's buildkitd flags, use `nodes`
    pub const FLAGS: &str = "flags";
}

/// Destination for published outputs
pub trait OutputSink {
    fn set(&mut self, name: &str, value: &str) -> Result<()>;
}

/// Writes outputs to the job runner's `GITHUB_OUTPUT` file
#[derive(Debug, Default)]
pub struct RunnerOutputs {
    output_file: Option<PathBuf>,
}

impl RunnerOutputs {
    pub fn from_env() -> Self {
        Self {
            output_file: std::env::var_os("GITHUB_OUTPUT")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
        }
    }

    pub fn with_output_file<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            output_file: Some(path.into()),
        }
    }
}

impl OutputSink for RunnerOutputs {
    fn set(&mut self, name: &str, value: &str) -> Result<()> {
        match &self.output_file {
            Some(path) => {
                append_file_command(path, name, value).map_err(|source| StateError::Io {
                    path: path.display().to_string(),
                    source,
                })?;
            }
            None => println!("::set-output name={}::{}", name, value),
        }
        debug!("Set output {}", name);
        Ok(())
    }
}

/// Collects outputs in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryOutputs {
    values: BTreeMap<String, String>,
}

impl MemoryOutputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn entries(&self) -> &BTreeMap<String, String> {
        &self.values
    }
}

impl OutputSink for MemoryOutputs {
    fn set(&mut self, name: &str, value: &str) -> Result<()> {
        self.values.insert(name.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_runner_outputs_append() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("output");
        let mut outputs = RunnerOutputs::with_output_file(&path);
        outputs.set(names::DRIVER, "docker-container").unwrap();
        outputs.set(names::PLATFORMS, "linux/amd64,linux/arm64").unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("driver<<ghadelimiter_"));
        assert!(content.contains("\ndocker-container\n"));
        assert!(content.contains("\nlinux/amd64,linux/arm64\n"));
    }

    #[test]
    fn test_memory_outputs_overwrite() {
        let mut outputs = MemoryOutputs::new();
        outputs.set(names::NAME, "a").unwrap();
        outputs.set(names::NAME, "b").unwrap();
        assert_eq!(outputs.get(names::NAME), Some("b"));
        assert_eq!(outputs.entries().len(), 1);
    }
}
