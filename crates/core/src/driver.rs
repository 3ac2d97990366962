//! Builder driver kinds

use crate::errors::{ConfigError, RiggerError};
use serde::{Deserialize, Serialize};

/// Backend strategy a builder uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DriverKind {
    /// Host-integrated default builder; no instance is created
    Docker,
    /// BuildKit running in a container managed by the host engine
    DockerContainer,
    /// BuildKit pods in a Kubernetes cluster
    Kubernetes,
    /// An externally managed BuildKit daemon
    Remote,
}

impl DriverKind {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Docker => "docker",
            Self::DockerContainer => "docker-container",
            Self::Kubernetes => "kubernetes",
            Self::Remote => "remote",
        }
    }

    /// The host-integrated default driver (fixed identity, nothing to create)
    pub fn is_host_default(&self) -> bool {
        matches!(self, Self::Docker)
    }

    /// Remote daemons take no local buildkitd flags or config
    pub fn accepts_daemon_config(&self) -> bool {
        !matches!(self, Self::Remote)
    }
}

impl std::str::FromStr for DriverKind {
    type Err = RiggerError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "docker" => Ok(Self::Docker),
            "docker-container" => Ok(Self::DockerContainer),
            "kubernetes" => Ok(Self::Kubernetes),
            "remote" => Ok(Self::Remote),
            _ => Err(ConfigError::UnknownDriver(s.to_string()).into()),
        }
    }
}

impl std::fmt::Display for DriverKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
