//! Builder-tool acquisition
//!
//! [`Toolchain`] is the collaborator the setup sequence uses to make the
//! builder tool available: reuse what is installed, install a release, or
//! build from a source reference. [`CliToolchain`] downloads releases over
//! HTTPS and builds from source through the host engine.

use crate::command::{command_for, TOOL_BINARY};
use crate::errors::{ConfigError, Result, ToolchainError};
use crate::exec::CommandRunner;
use crate::mode::ExecutionMode;
use crate::runner_env::RunnerEnv;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

const DEFAULT_API_BASE: &str = "https://api.github.com/repos/docker/buildx";
const DEFAULT_DOWNLOAD_BASE: &str = "https://github.com/docker/buildx/releases/download";

/// Sent with every release request
pub const USER_AGENT: &str = concat!("rigger/", env!("CARGO_PKG_VERSION"));

/// File name of the host-engine CLI plugin
pub const PLUGIN_NAME: &str = "docker-buildx";

/// Tool acquisition collaborator
#[allow(async_fn_in_trait)]
pub trait Toolchain {
    /// Install a release (`latest` or a version) into `install_dir`
    async fn install(&self, version: &str, install_dir: &Path, mode: ExecutionMode) -> Result<()>;

    /// Build the tool from a source reference and install it under `config_home`
    async fn build(&self, source_ref: &str, config_home: &Path, mode: ExecutionMode) -> Result<()>;

    /// Whether the tool can be invoked in this mode
    async fn is_available(&self, mode: ExecutionMode) -> bool;

    /// Raw output of the tool's `version` sub-command
    async fn get_version(&self, mode: ExecutionMode) -> Result<String>;
}

/// Where releases are looked up and downloaded from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseSource {
    /// Repository API base (`<base>/releases/latest`)
    pub api_base: String,
    /// Download base (`<base>/<tag>/<asset>`)
    pub download_base: String,
}

impl Default for ReleaseSource {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            download_base: DEFAULT_DOWNLOAD_BASE.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Release {
    tag_name: String,
}

/// Release download and build-from-source toolchain
#[derive(Debug, Clone)]
pub struct CliToolchain<R> {
    runner: R,
    client: reqwest::Client,
    releases: ReleaseSource,
    env: RunnerEnv,
}

impl<R: CommandRunner> CliToolchain<R> {
    pub fn new(runner: R, env: RunnerEnv) -> Result<Self> {
        Self::with_release_source(runner, env, ReleaseSource::default())
    }

    pub fn with_release_source(
        runner: R,
        env: RunnerEnv,
        releases: ReleaseSource,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ToolchainError::Download {
                what: "HTTP client".to_string(),
                message: e.to_string(),
            })?;
        Ok(Self {
            runner,
            client,
            releases,
            env,
        })
    }

    /// Resolve `latest` or normalise an explicit version into a release tag
    #[instrument(skip(self))]
    pub async fn resolve_tag(&self, version: &str) -> Result<String> {
        let version = version.trim();
        if !version.is_empty() && version != "latest" {
            return Ok(if version.starts_with('v') {
                version.to_string()
            } else {
                format!("v{}", version)
            });
        }

        let url = format!("{}/releases/latest", self.releases.api_base);
        let download_err = |e: reqwest::Error| ToolchainError::Download {
            what: "latest release metadata".to_string(),
            message: e.to_string(),
        };
        let release: Release = self
            .client
            .get(&url)
            .header("Accept", "application/vnd.github+json")
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(download_err)?
            .json()
            .await
            .map_err(download_err)?;
        debug!("Latest release is {}", release.tag_name);
        Ok(release.tag_name)
    }

    async fn download(&self, tag: &str) -> Result<Vec<u8>> {
        let asset = release_asset_for_host(tag)?;
        let url = format!("{}/{}/{}", self.releases.download_base, tag, asset);
        info!("Downloading {}", url);

        let download_err = |e: reqwest::Error| ToolchainError::Download {
            what: asset.clone(),
            message: e.to_string(),
        };
        let bytes = self
            .client
            .get(&url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(download_err)?
            .bytes()
            .await
            .map_err(download_err)?;
        Ok(bytes.to_vec())
    }
}

impl<R: CommandRunner> Toolchain for CliToolchain<R> {
    #[instrument(skip(self))]
    async fn install(&self, version: &str, install_dir: &Path, mode: ExecutionMode) -> Result<()> {
        let tag = self.resolve_tag(version).await?;
        let binary = self.download(&tag).await?;

        let dest = binary_destination(install_dir, mode);
        place_binary(&dest, &binary).await?;
        info!("Installed {} {} to {}", TOOL_BINARY, tag, dest.display());

        if mode.is_standalone() {
            self.env.add_path(install_dir)?;
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn build(&self, source_ref: &str, config_home: &Path, mode: ExecutionMode) -> Result<()> {
        if mode.is_standalone() {
            return Err(ConfigError::RequiresHostEngine {
                operation: "Building from source".to_string(),
            }
            .into());
        }

        let out_dir = self
            .env
            .temp_dir
            .join(format!("rigger-build-{}", uuid::Uuid::new_v4()));
        let command = command_for(
            [
                "build".to_string(),
                "--target".to_string(),
                "binaries".to_string(),
                "--build-arg".to_string(),
                "BUILDKIT_CONTEXT_KEEP_GIT_DIR=1".to_string(),
                "--output".to_string(),
                format!("type=local,dest={}", out_dir.display()),
                source_ref.to_string(),
            ],
            mode,
        );
        self.runner.run(&command).await?;

        let artifact = out_dir.join(executable_name(TOOL_BINARY));
        let binary = tokio::fs::read(&artifact).await.map_err(|_| {
            ToolchainError::MissingArtifact {
                source_ref: source_ref.to_string(),
                path: artifact.display().to_string(),
            }
        })?;

        let dest = binary_destination(config_home, mode);
        place_binary(&dest, &binary).await?;
        info!("Built {} from {} into {}", TOOL_BINARY, source_ref, dest.display());
        Ok(())
    }

    async fn is_available(&self, mode: ExecutionMode) -> bool {
        let command = command_for(["version"], mode);
        matches!(self.runner.output(&command).await, Ok(output) if output.success())
    }

    async fn get_version(&self, mode: ExecutionMode) -> Result<String> {
        let command = command_for(["version"], mode);
        Ok(self.runner.run(&command).await?.stdout.trim().to_string())
    }
}

/// Where an acquired binary lives: the CLI plugin directory in host-engine
/// mode, the install directory itself in standalone mode.
pub fn binary_destination(base: &Path, mode: ExecutionMode) -> PathBuf {
    match mode {
        ExecutionMode::HostEngine => base.join("cli-plugins").join(executable_name(PLUGIN_NAME)),
        ExecutionMode::Standalone => base.join(executable_name(TOOL_BINARY)),
    }
}

fn executable_name(stem: &str) -> String {
    if cfg!(windows) {
        format!("{}.exe", stem)
    } else {
        stem.to_string()
    }
}

async fn place_binary(dest: &Path, binary: &[u8]) -> Result<()> {
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(ToolchainError::Io)?;
    }
    tokio::fs::write(dest, binary)
        .await
        .map_err(ToolchainError::Io)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(dest, std::fs::Permissions::from_mode(0o755))
            .await
            .map_err(ToolchainError::Io)?;
    }
    Ok(())
}

/// Release asset name for a tag, OS, and architecture (Rust `std::env::consts` names)
pub fn release_asset(tag: &str, os: &str, arch: &str) -> Result<String> {
    let unsupported = || ToolchainError::UnsupportedPlatform {
        os: os.to_string(),
        arch: arch.to_string(),
    };
    let release_os = match os {
        "linux" | "windows" | "freebsd" => os,
        "macos" => "darwin",
        _ => return Err(unsupported().into()),
    };
    let release_arch = match arch {
        "x86_64" => "amd64",
        "x86" => "386",
        "aarch64" => "arm64",
        "arm" => "arm-v7",
        "powerpc64" => "ppc64le",
        "s390x" => "s390x",
        "riscv64" => "riscv64",
        _ => return Err(unsupported().into()),
    };
    let suffix = if release_os == "windows" { ".exe" } else { "" };
    Ok(format!("buildx-{}.{}-{}{}", tag, release_os, release_arch, suffix))
}

/// Release asset name for the current host
pub fn release_asset_for_host(tag: &str) -> Result<String> {
    release_asset(tag, std::env::consts::OS, std::env::consts::ARCH)
}
