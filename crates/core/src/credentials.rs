//! Builder credential provisioning
//!
//! For TLS-protected `tcp://` endpoints the job provides client certificates
//! through `BUILDER_NODE_<index>_AUTH_TLS_{CACERT,CERT,KEY}`. They are written
//! into the builder's credentials directory and turned into driver options.

use crate::driver::DriverKind;
use crate::errors::Result;
use reqwest::Url;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, instrument};

/// Credential provisioner collaborator
#[allow(async_fn_in_trait)]
pub trait CredentialProvisioner {
    /// Materialise credentials for node `index` into `dir` and return extra
    /// `--driver-opt` values. Safe to call again with the same arguments.
    async fn set_credentials(
        &self,
        dir: &Path,
        index: usize,
        driver: DriverKind,
        endpoint: Option<&str>,
    ) -> Result<Vec<String>>;
}

/// Environment-driven TLS client certificates
#[derive(Debug, Clone, Default)]
pub struct TlsCredentials {
    vars: Option<HashMap<String, String>>,
}

impl TlsCredentials {
    /// Read certificate material from the process environment
    pub fn from_env() -> Self {
        Self { vars: None }
    }

    /// Read certificate material from a fixed map
    pub fn with_vars(vars: HashMap<String, String>) -> Self {
        Self { vars: Some(vars) }
    }

    fn lookup(&self, key: &str) -> Option<String> {
        let value = match &self.vars {
            Some(vars) => vars.get(key).cloned(),
            None => std::env::var(key).ok(),
        };
        value.filter(|v| !v.is_empty())
    }
}

impl CredentialProvisioner for TlsCredentials {
    #[instrument(skip(self))]
    async fn set_credentials(
        &self,
        dir: &Path,
        index: usize,
        driver: DriverKind,
        endpoint: Option<&str>,
    ) -> Result<Vec<String>> {
        let Some(url) = endpoint.and_then(|e| Url::parse(e).ok()) else {
            return Ok(Vec::new());
        };
        if url.scheme() != "tcp" {
            return Ok(Vec::new());
        }

        let mut host = url.host_str().unwrap_or_default().to_string();
        if let Some(port) = url.port() {
            host = format!("{}-{}", host, port);
        }

        let mut driver_opts = Vec::new();
        for (kind, option) in [("CACERT", "cacert"), ("CERT", "cert"), ("KEY", "key")] {
            let Some(material) = self.lookup(&format!("BUILDER_NODE_{}_AUTH_TLS_{}", index, kind))
            else {
                continue;
            };
            let path = dir.join(format!("{}_{}.pem", option, host));
            tokio::fs::write(&path, material).await?;
            debug!("Wrote {} for node {} to {}", option, index, path.display());
            driver_opts.push(format!("{}={}", option, path.display()));
        }

        // Only the remote driver consumes client certificates as driver options
        if driver != DriverKind::Remote {
            return Ok(Vec::new());
        }
        Ok(driver_opts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn certs() -> TlsCredentials {
        TlsCredentials::with_vars(HashMap::from([
            (
                "BUILDER_NODE_0_AUTH_TLS_CACERT".to_string(),
                "ca-pem".to_string(),
            ),
            ("BUILDER_NODE_0_AUTH_TLS_CERT".to_string(), "cert-pem".to_string()),
            ("BUILDER_NODE_0_AUTH_TLS_KEY".to_string(), "key-pem".to_string()),
        ]))
    }

    #[tokio::test]
    async fn test_remote_tcp_endpoint_writes_certs() {
        let dir = TempDir::new().unwrap();
        let opts = certs()
            .set_credentials(
                dir.path(),
                0,
                DriverKind::Remote,
                Some("tcp://graviton2:1234"),
            )
            .await
            .unwrap();

        assert_eq!(opts.len(), 3);
        let cacert = dir.path().join("cacert_graviton2-1234.pem");
        assert_eq!(opts[0], format!("cacert={}", cacert.display()));
        assert_eq!(std::fs::read_to_string(&cacert).unwrap(), "ca-pem");
        assert!(opts[2].starts_with("key="));
    }

    #[tokio::test]
    async fn test_idempotent_retry() {
        let dir = TempDir::new().unwrap();
        let provisioner = certs();
        let first = provisioner
            .set_credentials(dir.path(), 0, DriverKind::Remote, Some("tcp://host:1"))
            .await
            .unwrap();
        let second = provisioner
            .set_credentials(dir.path(), 0, DriverKind::Remote, Some("tcp://host:1"))
            .await
            .unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_non_remote_driver_returns_no_opts() {
        let dir = TempDir::new().unwrap();
        let opts = certs()
            .set_credentials(
                dir.path(),
                0,
                DriverKind::DockerContainer,
                Some("tcp://host:1234"),
            )
            .await
            .unwrap();
        assert!(opts.is_empty());
    }

    #[tokio::test]
    async fn test_non_tcp_or_missing_endpoint() {
        let dir = TempDir::new().unwrap();
        let provisioner = certs();
        for endpoint in [None, Some("unix:///var/run/docker.sock"), Some("not a url")] {
            let opts = provisioner
                .set_credentials(dir.path(), 0, DriverKind::Remote, endpoint)
                .await
                .unwrap();
            assert!(opts.is_empty());
        }
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_no_material_returns_nothing() {
        let dir = TempDir::new().unwrap();
        let opts = TlsCredentials::with_vars(HashMap::new())
            .set_credentials(dir.path(), 0, DriverKind::Remote, Some("tcp://host:1"))
            .await
            .unwrap();
        assert!(opts.is_empty());
    }
}
