//! Mock collaborators for testing lifecycle flows
//!
//! These implement the collaborator traits without touching real processes,
//! networks, or engines. Each records what it was asked to do so tests can
//! assert on the exact sequence of external actions.

use crate::command::ToolCommand;
use crate::credentials::CredentialProvisioner;
use crate::driver::DriverKind;
use crate::engine::HostEngine;
use crate::errors::{CommandError, Result, ToolchainError};
use crate::exec::{CommandRunner, ExecOutput};
use crate::mode::ExecutionMode;
use crate::toolchain::Toolchain;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Debug, Clone)]
enum Scripted {
    Output(ExecOutput),
    SpawnError,
}

#[derive(Debug, Clone)]
struct Rule {
    program: String,
    prefix: Vec<String>,
    response: Scripted,
}

/// Scriptable command runner that records every command it receives
///
/// Unscripted commands succeed with empty output. When several rules match,
/// the most recently added one wins.
#[derive(Debug, Default)]
pub struct MockRunner {
    rules: Mutex<Vec<Rule>>,
    history: Mutex<Vec<ToolCommand>>,
}

impl MockRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Respond to `program` invocations whose args start with `prefix`
    pub fn respond(&self, program: &str, prefix: &[&str], output: ExecOutput) -> &Self {
        self.push_rule(program, prefix, Scripted::Output(output));
        self
    }

    /// Make `program` invocations whose args start with `prefix` fail to start
    pub fn fail_to_spawn(&self, program: &str, prefix: &[&str]) -> &Self {
        self.push_rule(program, prefix, Scripted::SpawnError);
        self
    }

    fn push_rule(&self, program: &str, prefix: &[&str], response: Scripted) {
        self.rules.lock().unwrap().push(Rule {
            program: program.to_string(),
            prefix: prefix.iter().map(|s| s.to_string()).collect(),
            response,
        });
    }

    /// Every command received, in order
    pub fn history(&self) -> Vec<ToolCommand> {
        self.history.lock().unwrap().clone()
    }

    /// Commands for `program` whose args start with `prefix`
    pub fn calls_matching(&self, program: &str, prefix: &[&str]) -> Vec<ToolCommand> {
        self.history()
            .into_iter()
            .filter(|c| c.program == program && c.args_start_with(prefix))
            .collect()
    }
}

impl CommandRunner for MockRunner {
    async fn output(&self, command: &ToolCommand) -> Result<ExecOutput> {
        self.history.lock().unwrap().push(command.clone());

        let rules = self.rules.lock().unwrap();
        let matched = rules.iter().rev().find(|rule| {
            let prefix: Vec<&str> = rule.prefix.iter().map(String::as_str).collect();
            rule.program == command.program && command.args_start_with(&prefix)
        });

        match matched.map(|r| r.response.clone()) {
            Some(Scripted::Output(output)) => Ok(output),
            Some(Scripted::SpawnError) => Err(CommandError::Spawn {
                program: command.program.clone(),
                message: "mock spawn failure".to_string(),
            }
            .into()),
            None => Ok(ExecOutput::ok("")),
        }
    }
}

/// Host engine with fixed reachability
#[derive(Debug, Clone, Copy)]
pub struct MockEngine {
    pub available: bool,
}

impl MockEngine {
    pub fn available() -> Self {
        Self { available: true }
    }

    pub fn unavailable() -> Self {
        Self { available: false }
    }
}

impl HostEngine for MockEngine {
    async fn is_available(&self) -> bool {
        self.available
    }
}

/// Recorded toolchain action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolchainCall {
    Install {
        version: String,
        install_dir: PathBuf,
        mode: ExecutionMode,
    },
    Build {
        source_ref: String,
        config_home: PathBuf,
        mode: ExecutionMode,
    },
}

/// Toolchain with a fixed installed state and version string
#[derive(Debug)]
pub struct MockToolchain {
    /// Whether the tool counts as already installed
    pub available: bool,
    /// Raw `version` output
    pub version_output: String,
    /// Fail installs with a download error
    pub fail_install: bool,
    calls: Mutex<Vec<ToolchainCall>>,
}

impl MockToolchain {
    pub fn new(available: bool, version_output: &str) -> Self {
        Self {
            available,
            version_output: version_output.to_string(),
            fail_install: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Installed tool reporting `github.com/docker/buildx v<version> <commit>`
    pub fn installed(version: &str) -> Self {
        Self::new(
            true,
            &format!(
                "github.com/docker/buildx v{} 00000000000000000000000000000000deadbeef",
                version
            ),
        )
    }

    pub fn calls(&self) -> Vec<ToolchainCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl Toolchain for MockToolchain {
    async fn install(&self, version: &str, install_dir: &Path, mode: ExecutionMode) -> Result<()> {
        self.calls.lock().unwrap().push(ToolchainCall::Install {
            version: version.to_string(),
            install_dir: install_dir.to_path_buf(),
            mode,
        });
        if self.fail_install {
            return Err(ToolchainError::Download {
                what: version.to_string(),
                message: "mock download failure".to_string(),
            }
            .into());
        }
        Ok(())
    }

    async fn build(&self, source_ref: &str, config_home: &Path, mode: ExecutionMode) -> Result<()> {
        self.calls.lock().unwrap().push(ToolchainCall::Build {
            source_ref: source_ref.to_string(),
            config_home: config_home.to_path_buf(),
            mode,
        });
        Ok(())
    }

    async fn is_available(&self, _mode: ExecutionMode) -> bool {
        self.available
    }

    async fn get_version(&self, _mode: ExecutionMode) -> Result<String> {
        Ok(self.version_output.clone())
    }
}

/// Recorded credential request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialsCall {
    pub dir: PathBuf,
    pub index: usize,
    pub driver: DriverKind,
    pub endpoint: Option<String>,
}

/// Credential provisioner returning fixed driver options
#[derive(Debug, Default)]
pub struct MockCredentials {
    pub driver_opts: Vec<String>,
    calls: Mutex<Vec<CredentialsCall>>,
}

impl MockCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn returning(driver_opts: &[&str]) -> Self {
        Self {
            driver_opts: driver_opts.iter().map(|s| s.to_string()).collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<CredentialsCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl CredentialProvisioner for MockCredentials {
    async fn set_credentials(
        &self,
        dir: &Path,
        index: usize,
        driver: DriverKind,
        endpoint: Option<&str>,
    ) -> Result<Vec<String>> {
        self.calls.lock().unwrap().push(CredentialsCall {
            dir: dir.to_path_buf(),
            index,
            driver,
            endpoint: endpoint.map(str::to_string),
        });
        Ok(self.driver_opts.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_runner_latest_rule_wins() {
        let runner = MockRunner::new();
        runner
            .respond("docker", &["buildx"], ExecOutput::ok("first"))
            .respond("docker", &["buildx", "inspect"], ExecOutput::ok("second"));

        let cmd = ToolCommand::engine(["buildx", "inspect", "b"]);
        assert_eq!(runner.output(&cmd).await.unwrap().stdout, "second");

        let cmd = ToolCommand::engine(["buildx", "version"]);
        assert_eq!(runner.output(&cmd).await.unwrap().stdout, "first");

        let cmd = ToolCommand::engine(["info"]);
        assert!(runner.output(&cmd).await.unwrap().stdout.is_empty());

        assert_eq!(runner.history().len(), 3);
        assert_eq!(runner.calls_matching("docker", &["buildx"]).len(), 2);
    }

    #[tokio::test]
    async fn test_mock_runner_spawn_failure() {
        let runner = MockRunner::new();
        runner.fail_to_spawn("buildx", &[]);
        let cmd = ToolCommand::new("buildx", vec!["version".to_string()]);
        assert!(runner.output(&cmd).await.is_err());
    }
}
