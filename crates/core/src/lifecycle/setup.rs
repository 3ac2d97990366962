//! Setup sequence
//!
//! A strictly sequential state machine: mode detection, tool acquisition,
//! version capture, identity assignment, credentials directory, instance
//! creation, bootstrap, optional default install, inspection and output
//! publication, BuildKit diagnostics, and debug capture. Each durable effect
//! is recorded into cross-phase state before the next step starts.

use crate::command::{command_for, ToolCommand};
use crate::config_file::{get_config_file, get_config_inline};
use crate::credentials::CredentialProvisioner;
use crate::driver::DriverKind;
use crate::engine::{buildkit_version, container_name_for, log_engine_info, HostEngine};
use crate::errors::{ConfigError, Result};
use crate::exec::{CommandRunner, ExecOutput};
use crate::inputs::{ConfigSource, Inputs, VersionRequest};
use crate::inspect::{inspect, BuilderInfo};
use crate::mode::ExecutionMode;
use crate::outputs::{names, OutputSink};
use crate::runner_env::{LogGroup, RunnerEnv};
use crate::state::{StateRecorder, StateStore};
use crate::toolchain::Toolchain;
use crate::version::{ToolVersion, BOOTSTRAP_BUILDER, DRIVER_OPTS};
use std::path::PathBuf;
use tracing::{debug, info, instrument, warn};

/// Identity of the host-integrated default builder
pub const DEFAULT_BUILDER: &str = "default";

/// What a successful setup produced
#[derive(Debug, Clone)]
pub struct SetupOutcome {
    /// Builder identity
    pub identity: String,
    /// Resolved execution mode
    pub mode: ExecutionMode,
    /// Negotiated tool version
    pub version: ToolVersion,
    /// Inspection result that was published
    pub builder: BuilderInfo,
}

/// Setup orchestrator over its external collaborators
pub struct Setup<'a, R, H, T, P> {
    runner: &'a R,
    engine: &'a H,
    toolchain: &'a T,
    credentials: &'a P,
    env: &'a RunnerEnv,
}

impl<'a, R, H, T, P> Setup<'a, R, H, T, P>
where
    R: CommandRunner,
    H: HostEngine,
    T: Toolchain,
    P: CredentialProvisioner,
{
    pub fn new(
        runner: &'a R,
        engine: &'a H,
        toolchain: &'a T,
        credentials: &'a P,
        env: &'a RunnerEnv,
    ) -> Self {
        Self {
            runner,
            engine,
            toolchain,
            credentials,
            env,
        }
    }

    /// Run the full setup sequence
    #[instrument(skip_all, fields(driver = %inputs.driver))]
    pub async fn run(
        &self,
        inputs: &Inputs,
        state: &mut dyn StateStore,
        outputs: &mut dyn OutputSink,
    ) -> Result<SetupOutcome> {
        let mut recorder = StateRecorder::new(state);
        recorder.record_phase_marker()?;
        recorder.record_cleanup(inputs.cleanup)?;

        let mode = ExecutionMode::from_engine_available(self.engine.is_available().await);
        recorder.record_mode(mode)?;
        info!("Execution mode: {}", mode);
        check_mode_constraints(inputs, mode)?;

        if mode.is_standalone() {
            info!("Docker info skipped in standalone mode");
        } else {
            let _group = LogGroup::start("Docker info");
            log_engine_info(self.runner).await;
        }

        self.acquire_tool(inputs, mode).await?;
        let version = self.capture_version(mode).await?;

        let identity = if inputs.driver.is_host_default() {
            DEFAULT_BUILDER.to_string()
        } else {
            generate_identity()
        };
        outputs.set(names::NAME, &identity)?;

        if !inputs.driver.is_host_default() {
            recorder.record_builder_name(&identity)?;

            let credentials_dir = self.env.credentials_dir(mode, &identity)?;
            tokio::fs::create_dir_all(&credentials_dir).await?;
            recorder.record_credentials_dir(&credentials_dir)?;

            let create_args = self
                .create_args(inputs, &identity, &version, &credentials_dir)
                .await?;
            {
                let _group = LogGroup::start("Creating a new builder instance");
                self.run_logged(&command_for(create_args, mode)).await?;
            }

            let _group = LogGroup::start("Booting builder");
            self.run_logged(&command_for(bootstrap_args(&identity, &version), mode))
                .await?;
        }

        if inputs.install {
            let _group = LogGroup::start("Setting buildx as default builder");
            self.run_logged(&command_for(["install"], mode)).await?;
        }

        let builder = {
            let _group = LogGroup::start("Inspect builder");
            let builder = inspect(self.runner, &identity, mode).await?;
            publish(&builder, outputs)?;
            builder
        };

        if builder.driver.as_deref() == Some(DriverKind::DockerContainer.as_str())
            && !mode.is_standalone()
        {
            if let Some(node_name) = builder.first_node().and_then(|n| n.name.as_deref()) {
                recorder.record_container_name(&container_name_for(node_name))?;
            }
            self.log_buildkit_versions(&builder).await;
        }

        let flags = builder
            .first_node()
            .and_then(|n| n.buildkitd_flags.as_deref())
            .unwrap_or_default();
        if self.env.debug || flags_enable_debug(flags) {
            debug!("Debug mode detected; container logs will be captured at cleanup");
            recorder.record_debug()?;
        }

        Ok(SetupOutcome {
            identity,
            mode,
            version,
            builder,
        })
    }

    async fn run_logged(&self, command: &ToolCommand) -> Result<ExecOutput> {
        let output = self.runner.run(command).await?;
        log_output(&output);
        Ok(output)
    }

    async fn acquire_tool(&self, inputs: &Inputs, mode: ExecutionMode) -> Result<()> {
        match inputs.version_request() {
            VersionRequest::Source(source_ref) => {
                let config_home = self.env.engine_config_home()?;
                self.toolchain.build(source_ref, &config_home, mode).await
            }
            VersionRequest::Pinned(version) => {
                let dir = self.install_dir(mode)?;
                self.toolchain.install(version, &dir, mode).await
            }
            VersionRequest::Unspecified => {
                if self.toolchain.is_available(mode).await {
                    debug!("Reusing installed builder tool");
                    return Ok(());
                }
                let dir = self.install_dir(mode)?;
                self.toolchain.install("latest", &dir, mode).await
            }
        }
    }

    fn install_dir(&self, mode: ExecutionMode) -> Result<PathBuf> {
        match mode {
            ExecutionMode::Standalone => Ok(self.env.temp_dir.join("rigger").join("bin")),
            ExecutionMode::HostEngine => self.env.engine_config_home(),
        }
    }

    async fn capture_version(&self, mode: ExecutionMode) -> Result<ToolVersion> {
        let _group = LogGroup::start("Buildx version");
        let raw = self.toolchain.get_version(mode).await?;
        info!("{}", raw);
        let version = ToolVersion::parse(&raw);
        if version.as_version().is_none() {
            warn!("Unrecognised builder tool version {:?}; optional flags disabled", raw);
        }
        Ok(version)
    }

    async fn create_args(
        &self,
        inputs: &Inputs,
        identity: &str,
        version: &ToolVersion,
        credentials_dir: &std::path::Path,
    ) -> Result<Vec<String>> {
        let mut args = vec![
            "create".to_string(),
            "--name".to_string(),
            identity.to_string(),
            "--driver".to_string(),
            inputs.driver.to_string(),
        ];

        let credential_opts = self
            .credentials
            .set_credentials(credentials_dir, 0, inputs.driver, inputs.endpoint.as_deref())
            .await?;

        if version.satisfies(DRIVER_OPTS) {
            for opt in inputs.driver_opts.iter().chain(&credential_opts) {
                args.push("--driver-opt".to_string());
                args.push(opt.clone());
            }
            if let Some(flags) = &inputs.buildkitd_flags {
                if inputs.driver.accepts_daemon_config() {
                    args.push("--buildkitd-flags".to_string());
                    args.push(flags.clone());
                }
            }
        } else if !inputs.driver_opts.is_empty() || !credential_opts.is_empty() {
            warn!("Driver options need builder tool {}; ignoring them", DRIVER_OPTS);
        }

        if inputs.use_builder {
            args.push("--use".to_string());
        }
        if let Some(endpoint) = &inputs.endpoint {
            args.push(endpoint.clone());
        }

        if inputs.driver.accepts_daemon_config() {
            let config = match inputs.config_source() {
                Some(ConfigSource::File(path)) => Some(get_config_file(path)?),
                Some(ConfigSource::Inline(text)) => Some(get_config_inline(text, &self.env.temp_dir)?),
                None => None,
            };
            if let Some(path) = config {
                args.push("--config".to_string());
                args.push(path.display().to_string());
            }
        }
        Ok(args)
    }

    async fn log_buildkit_versions(&self, builder: &BuilderInfo) {
        let _group = LogGroup::start("BuildKit version");
        for node in &builder.nodes {
            let Some(name) = node.name.as_deref() else {
                continue;
            };
            match buildkit_version(self.runner, &container_name_for(name)).await {
                Ok(version) => info!("{}: {}", name, version),
                Err(e) => warn!("Couldn't get BuildKit version for {}: {}", name, e),
            }
        }
    }
}

/// Reject requests standalone mode cannot honour, before any tool command runs
fn check_mode_constraints(inputs: &Inputs, mode: ExecutionMode) -> Result<()> {
    if !mode.is_standalone() {
        return Ok(());
    }
    if let VersionRequest::Source(_) = inputs.version_request() {
        return Err(ConfigError::RequiresHostEngine {
            operation: "Building from source".to_string(),
        }
        .into());
    }
    if inputs.install {
        return Err(ConfigError::RequiresHostEngine {
            operation: "Installing as default builder".to_string(),
        }
        .into());
    }
    Ok(())
}

/// A fresh builder name, unique per call
pub fn generate_identity() -> String {
    format!("builder-{}", uuid::Uuid::new_v4())
}

fn bootstrap_args(identity: &str, version: &ToolVersion) -> Vec<String> {
    let mut args = vec!["inspect".to_string(), "--bootstrap".to_string()];
    if version.satisfies(BOOTSTRAP_BUILDER) {
        args.push("--builder".to_string());
        args.push(identity.to_string());
    }
    args
}

/// Echo captured output into the current log group
fn log_output(output: &ExecOutput) {
    for line in output.stdout.lines().chain(output.stderr.lines()) {
        if !line.trim().is_empty() {
            info!("{}", line);
        }
    }
}

fn publish(builder: &BuilderInfo, outputs: &mut dyn OutputSink) -> Result<()> {
    outputs.set(names::DRIVER, builder.driver.as_deref().unwrap_or_default())?;

    let first = builder.first_node().cloned().unwrap_or_default();
    outputs.set(names::PLATFORMS, &first.platforms_csv())?;
    outputs.set(names::NODES, &builder.nodes_json())?;

    // deprecated first-node mirrors
    outputs.set(names::ENDPOINT, first.endpoint.as_deref().unwrap_or_default())?;
    outputs.set(names::STATUS, first.status.as_deref().unwrap_or_default())?;
    outputs.set(names::FLAGS, first.buildkitd_flags.as_deref().unwrap_or_default())?;

    info!(
        "Builder {} uses driver {} with {} node(s)",
        builder.name.as_deref().unwrap_or_default(),
        builder.driver.as_deref().unwrap_or_default(),
        builder.nodes.len()
    );
    Ok(())
}

/// Whether daemon flags switch on BuildKit debug output
pub fn flags_enable_debug(flags: &str) -> bool {
    match shell_words::split(flags) {
        Ok(tokens) => tokens.iter().any(|t| is_debug_switch(t)),
        Err(_) => flags.split_whitespace().any(is_debug_switch),
    }
}

fn is_debug_switch(token: &str) -> bool {
    match token.strip_prefix("--debug") {
        Some("") => true,
        Some(rest) => rest
            .strip_prefix('=')
            .is_some_and(|value| !value.eq_ignore_ascii_case("false")),
        None => false,
    }
}
