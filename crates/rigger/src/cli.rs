use crate::commands;
use anyhow::Result;
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use rigger_core::driver::DriverKind;
use rigger_core::inputs::{parse_bool, parse_list, Inputs, DEFAULT_BUILDKITD_FLAGS};
use rigger_core::state::{FileStateStore, RunnerStateStore, StateStore};
use std::path::{Path, PathBuf};

/// Log format options
#[derive(Debug, Clone, ValueEnum)]
pub enum LogFormat {
    /// Human-readable text format
    Text,
    /// JSON structured format
    Json,
}

/// Log level options
#[derive(Debug, Clone, ValueEnum)]
pub enum LogLevel {
    /// Error messages only
    Error,
    /// Warning and error messages
    Warn,
    /// Informational messages and above
    Info,
    /// Debug messages and above
    Debug,
    /// All messages including trace
    Trace,
}

/// Setup inputs; every flag can also be given as the job-runner `INPUT_*` variable
#[derive(Args, Debug, Clone)]
pub struct SetupArgs {
    /// Builder tool version to install (e.g. 0.9.1, latest) or a git source URL to build from
    #[arg(long = "version-spec", env = "INPUT_VERSION", value_name = "VERSION|URL")]
    pub version: Option<String>,

    /// Builder driver (docker, docker-container, kubernetes, remote)
    #[arg(long, env = "INPUT_DRIVER", default_value = "docker-container")]
    pub driver: String,

    /// Driver options, one per line
    #[arg(long, env = "INPUT_DRIVER-OPTS", default_value = "")]
    pub driver_opts: String,

    /// BuildKit daemon flags
    #[arg(long, env = "INPUT_BUILDKITD-FLAGS", default_value = DEFAULT_BUILDKITD_FLAGS)]
    pub buildkitd_flags: Option<String>,

    /// Builder endpoint (Docker context or endpoint URL)
    #[arg(long, env = "INPUT_ENDPOINT")]
    pub endpoint: Option<String>,

    /// BuildKit config file
    #[arg(long, env = "INPUT_CONFIG", value_name = "PATH")]
    pub config: Option<String>,

    /// Inline BuildKit config, used when --config is not set
    #[arg(long, env = "INPUT_CONFIG-INLINE", value_name = "TOML")]
    pub config_inline: Option<String>,

    /// Make `docker build` an alias of `docker buildx build`
    #[arg(long, env = "INPUT_INSTALL", default_value_t = false, action = ArgAction::Set, value_parser = parse_flag)]
    pub install: bool,

    /// Switch to the new builder
    #[arg(long = "use", env = "INPUT_USE", default_value_t = true, action = ArgAction::Set, value_parser = parse_flag)]
    pub use_builder: bool,

    /// Remove the builder when the job ends
    #[arg(long, env = "INPUT_CLEANUP", default_value_t = true, action = ArgAction::Set, value_parser = parse_flag)]
    pub cleanup: bool,
}

fn parse_flag(value: &str) -> std::result::Result<bool, String> {
    parse_bool("flag", value).map_err(|e| e.to_string())
}

impl SetupArgs {
    /// Resolve the immutable setup configuration
    pub fn into_inputs(self) -> rigger_core::errors::Result<Inputs> {
        let driver: DriverKind = self.driver.parse()?;
        Ok(Inputs {
            version: self.version,
            driver,
            driver_opts: parse_list(&self.driver_opts, true),
            buildkitd_flags: self.buildkitd_flags,
            endpoint: self.endpoint,
            config: self.config,
            config_inline: self.config_inline,
            install: self.install,
            use_builder: self.use_builder,
            cleanup: self.cleanup,
        }
        .normalized())
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run setup or cleanup depending on whether setup already ran in this job
    Run {
        #[command(flatten)]
        inputs: SetupArgs,
    },
    /// Create, bootstrap, and inspect a builder
    Setup {
        #[command(flatten)]
        inputs: SetupArgs,
    },
    /// Capture diagnostics and remove what setup created
    Cleanup,
}

#[derive(Parser, Debug)]
#[command(
    name = env!("CARGO_PKG_NAME"),
    version,
    about = "Ephemeral builder orchestrator for CI jobs",
    long_about = "Ephemeral builder orchestrator for CI jobs\n\nCreates a buildx builder for the current job and removes it again in the post-job step. The two phases share state through the job runner's state file.",
    color = clap::ColorChoice::Auto
)]
pub struct Cli {
    /// Log format (text or json, defaults to text, can be set via RIGGER_LOG_FORMAT env var)
    #[arg(long, global = true, value_enum)]
    pub log_format: Option<LogFormat>,

    /// Log level
    #[arg(long, global = true, value_enum, default_value = "info")]
    pub log_level: LogLevel,

    /// JSON file holding cross-phase state instead of the job runner's state
    #[arg(long, global = true, env = "RIGGER_STATE_FILE", value_name = "PATH")]
    pub state_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub async fn dispatch(self) -> Result<()> {
        let log_format = match self.log_format {
            Some(LogFormat::Text) => Some("text"),
            Some(LogFormat::Json) => Some("json"),
            None => None, // Let logging module check environment variable
        };

        let log_level = match self.log_level {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        };

        if std::env::var_os("RIGGER_LOG").is_none() && std::env::var_os("RUST_LOG").is_none() {
            std::env::set_var(
                "RUST_LOG",
                format!("rigger={},rigger_core={}", log_level, log_level),
            );
        }
        rigger_core::logging::init(log_format)?;
        tracing::debug!("CLI initialized with log level: {}", log_level);

        let mut state = open_state_store(self.state_file.as_deref())?;

        match self.command {
            Commands::Run { inputs } => commands::run::execute_run(inputs, state.as_mut()).await,
            Commands::Setup { inputs } => {
                commands::setup::execute_setup(inputs.into_inputs()?, state.as_mut()).await
            }
            Commands::Cleanup => commands::cleanup::execute_cleanup(state.as_ref()).await,
        }
    }
}

fn open_state_store(path: Option<&Path>) -> Result<Box<dyn StateStore>> {
    Ok(match path {
        Some(path) => Box::new(FileStateStore::open(path)?),
        None => Box::new(RunnerStateStore::from_env()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("rigger").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_setup_defaults() {
        let cli = parse(&["setup"]);
        let Commands::Setup { inputs } = cli.command else {
            panic!("expected setup");
        };
        let inputs = inputs.into_inputs().unwrap();
        assert_eq!(inputs.driver, DriverKind::DockerContainer);
        assert!(inputs.use_builder);
        assert!(inputs.cleanup);
        assert!(!inputs.install);
        assert!(inputs.driver_opts.is_empty());
        assert_eq!(inputs.buildkitd_flags.as_deref(), Some(DEFAULT_BUILDKITD_FLAGS));
    }

    #[test]
    fn test_setup_inputs_parsed() {
        let cli = parse(&[
            "setup",
            "--driver",
            "remote",
            "--driver-opts",
            "env.no_proxy=a,b\nnetwork=host\n",
            "--buildkitd-flags",
            "",
            "--use",
            "FALSE",
            "--endpoint",
            "tcp://buildkitd:1234",
        ]);
        let Commands::Setup { inputs } = cli.command else {
            panic!("expected setup");
        };
        let inputs = inputs.into_inputs().unwrap();
        assert_eq!(inputs.driver, DriverKind::Remote);
        assert_eq!(inputs.driver_opts, vec!["env.no_proxy=a,b", "network=host"]);
        assert!(inputs.buildkitd_flags.is_none());
        assert!(!inputs.use_builder);
        assert_eq!(inputs.endpoint.as_deref(), Some("tcp://buildkitd:1234"));
    }

    #[test]
    fn test_unknown_driver_is_config_error() {
        let cli = parse(&["setup", "--driver", "lxc"]);
        let Commands::Setup { inputs } = cli.command else {
            panic!("expected setup");
        };
        assert!(inputs.into_inputs().unwrap_err().is_config());
    }

    #[test]
    fn test_invalid_flag_value_rejected() {
        let result = Cli::try_parse_from(["rigger", "setup", "--install", "maybe"]);
        assert!(result.is_err());
    }
}
