//! Shared fixtures for lifecycle integration tests

#![allow(dead_code)]

use rigger_core::exec::ExecOutput;
use rigger_core::mock::MockRunner;
use rigger_core::runner_env::RunnerEnv;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

pub const CONTAINER_INSPECT: &str = "Name:   builder-test
Driver: docker-container

Nodes:
Name:      builder-test0
Endpoint:  unix:///var/run/docker.sock
Status:    running
Flags:     --allow-insecure-entitlement security.insecure --allow-insecure-entitlement network.host
Buildkit:  v0.10.4
Platforms: linux/amd64, linux/arm64
";

pub const DEFAULT_INSPECT: &str = "Name:   default
Driver: docker

Nodes:
Name:      default
Endpoint:  default
Status:    running
Platforms: linux/amd64, linux/386
";

pub const REMOTE_INSPECT: &str = "Name:   builder-remote
Driver: remote

Nodes:
Name:      builder-remote0
Endpoint:  tcp://buildkitd.example:1234
Status:    running
Platforms: linux/amd64
";

pub const TWO_NODE_INSPECT: &str = "Name:   builder-multi
Driver: docker-container

Nodes:
Name:      builder-multi0
Endpoint:  unix:///var/run/docker.sock
Status:    running
Platforms: linux/amd64

Name:      builder-multi1
Endpoint:  unix:///var/run/docker.sock
Status:    running
Platforms: linux/arm64
";

/// Log sink shared with a test subscriber
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    /// Install a text subscriber writing into this buffer on the current thread
    pub fn capture(&self) -> tracing::subscriber::DefaultGuard {
        let buffer = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_ansi(false)
            .with_writer(move || buffer.clone())
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Job environment rooted in a temp dir
pub struct TestEnv {
    pub root: TempDir,
    pub env: RunnerEnv,
}

impl TestEnv {
    pub fn new() -> Self {
        let root = TempDir::new().expect("temp dir");
        let env = RunnerEnv {
            debug: false,
            temp_dir: root.path().join("runner-temp"),
            docker_config: Some(root.path().join("docker")),
            buildx_config: Some(root.path().join("buildx-standalone")),
            home_dir: Some(root.path().join("home")),
            path_file: None,
        };
        Self { root, env }
    }

    pub fn certs_root(&self) -> PathBuf {
        self.root.path().join("docker").join("buildx").join("certs")
    }
}

/// Runner answering host-engine `buildx inspect` with `output`
pub fn host_runner(output: &str) -> MockRunner {
    let runner = MockRunner::new();
    runner.respond("docker", &["buildx", "inspect"], ExecOutput::ok(output));
    runner
}

/// Runner answering standalone `inspect` with `output`
pub fn standalone_runner(output: &str) -> MockRunner {
    let runner = MockRunner::new();
    runner.respond("buildx", &["inspect"], ExecOutput::ok(output));
    runner
}
