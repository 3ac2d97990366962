//! Setup configuration inputs
//!
//! [`Inputs`] is resolved once (by the CLI layer) and never mutated afterwards.

use crate::driver::DriverKind;
use crate::errors::{ConfigError, Result};
use reqwest::Url;

/// Daemon flags used when the input is not provided
pub const DEFAULT_BUILDKITD_FLAGS: &str =
    "--allow-insecure-entitlement security.insecure --allow-insecure-entitlement network.host";

/// Immutable setup configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inputs {
    /// Explicit tool version, or a source reference URL to build from
    pub version: Option<String>,
    /// Builder driver
    pub driver: DriverKind,
    /// Driver options, in order
    pub driver_opts: Vec<String>,
    /// BuildKit daemon flags
    pub buildkitd_flags: Option<String>,
    /// Builder endpoint (positional argument to `create`)
    pub endpoint: Option<String>,
    /// BuildKit config file path
    pub config: Option<String>,
    /// Inline BuildKit config text, used only without `config`
    pub config_inline: Option<String>,
    /// Register the tool as the host engine's default build command
    pub install: bool,
    /// Switch to the new builder immediately
    pub use_builder: bool,
    /// Tear the builder down at the end of the job
    pub cleanup: bool,
}

impl Default for Inputs {
    fn default() -> Self {
        Self {
            version: None,
            driver: DriverKind::DockerContainer,
            driver_opts: Vec::new(),
            buildkitd_flags: Some(DEFAULT_BUILDKITD_FLAGS.to_string()),
            endpoint: None,
            config: None,
            config_inline: None,
            install: false,
            use_builder: true,
            cleanup: true,
        }
    }
}

/// Where the BuildKit config comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource<'a> {
    File(&'a str),
    Inline(&'a str),
}

/// What the acquisition step should do, in priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionRequest<'a> {
    /// Build from a source reference
    Source(&'a str),
    /// Install this exact version
    Pinned(&'a str),
    /// No preference: reuse what is installed, else install latest
    Unspecified,
}

impl Inputs {
    /// Classify the version input
    pub fn version_request(&self) -> VersionRequest<'_> {
        match self.version.as_deref() {
            Some(v) if is_valid_url(v) => VersionRequest::Source(v),
            Some(v) => VersionRequest::Pinned(v),
            None => VersionRequest::Unspecified,
        }
    }

    /// The config source honoured for `create`; a file path wins over inline text
    pub fn config_source(&self) -> Option<ConfigSource<'_>> {
        if let Some(path) = self.config.as_deref() {
            return Some(ConfigSource::File(path));
        }
        self.config_inline.as_deref().map(ConfigSource::Inline)
    }

    /// Drop empty optional values so that "set but empty" means absent
    pub fn normalized(mut self) -> Self {
        self.version = non_empty(self.version);
        self.buildkitd_flags = non_empty(self.buildkitd_flags);
        self.endpoint = non_empty(self.endpoint);
        self.config = non_empty(self.config);
        self.config_inline = self.config_inline.filter(|v| !v.trim().is_empty());
        self.driver_opts.retain(|o| !o.trim().is_empty());
        self
    }
}

/// An absolute URL with a host, e.g. `https://github.com/docker/buildx.git#master`
pub fn is_valid_url(value: &str) -> bool {
    Url::parse(value.trim())
        .map(|url| url.has_host())
        .unwrap_or(false)
}

/// Split a list input on newlines and, unless `ignore_comma`, on commas
///
/// ```rust
/// use rigger_core::inputs::parse_list;
///
/// assert_eq!(parse_list("a,b\n c \n\n", false), vec!["a", "b", "c"]);
/// assert_eq!(parse_list("env.no_proxy=a,b\nnetwork=host", true), vec!["env.no_proxy=a,b", "network=host"]);
/// ```
pub fn parse_list(input: &str, ignore_comma: bool) -> Vec<String> {
    input
        .lines()
        .flat_map(|line| {
            if ignore_comma {
                vec![line]
            } else {
                line.split(',').collect()
            }
        })
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse a boolean input (`true`/`false`, case-insensitive)
pub fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(ConfigError::InvalidInput {
            name: name.to_string(),
            message: format!("expected true or false, got '{}'", value),
        }
        .into()),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
