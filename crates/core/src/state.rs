//! Cross-phase state shared between the setup and cleanup invocations
//!
//! The two phases run as separate processes, so everything cleanup needs is
//! persisted through a [`StateStore`]. Setup writes each field at most once
//! through a [`StateRecorder`]; cleanup reads a [`CrossPhaseState`] snapshot
//! and never writes.
//!
//! Backends:
//!
//! - [`RunnerStateStore`]: the job runner's state file. Writes append to
//!   `GITHUB_STATE`; reads come from the `STATE_<key>` environment variables
//!   the runner injects into the later invocation.
//! - [`FileStateStore`]: a JSON file, for running both phases locally.
//! - [`MemoryStateStore`]: in-process, for tests.

use crate::errors::{Result, StateError};
use crate::mode::ExecutionMode;
use crate::runner_env::append_file_command;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, instrument, warn};

/// State keys
pub mod keys {
    /// Phase marker: present once setup has started
    pub const IS_POST: &str = "isPost";
    pub const STANDALONE: &str = "standalone";
    pub const BUILDER_NAME: &str = "builderName";
    pub const CREDENTIALS_DIR: &str = "certsDir";
    pub const CONTAINER_NAME: &str = "containerName";
    pub const DEBUG: &str = "debug";
    pub const CLEANUP: &str = "cleanup";
}

/// Flat string key/value store surviving between phases
pub trait StateStore {
    /// Persist a value
    fn save(&mut self, key: &str, value: &str) -> Result<()>;

    /// Read a value; absent and empty are equivalent
    fn get(&self, key: &str) -> Option<String>;
}

/// Job-runner backed state
#[derive(Debug, Default)]
pub struct RunnerStateStore {
    state_file: Option<PathBuf>,
    written: HashMap<String, String>,
}

impl RunnerStateStore {
    /// Use `GITHUB_STATE` for writes and `STATE_*` variables for reads
    pub fn from_env() -> Self {
        Self {
            state_file: std::env::var_os("GITHUB_STATE")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            written: HashMap::new(),
        }
    }

    /// Use an explicit state file for writes
    pub fn with_state_file<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            state_file: Some(path.into()),
            written: HashMap::new(),
        }
    }
}

impl StateStore for RunnerStateStore {
    #[instrument(skip(self, value))]
    fn save(&mut self, key: &str, value: &str) -> Result<()> {
        match &self.state_file {
            Some(path) => {
                append_file_command(path, key, value).map_err(|source| StateError::Io {
                    path: path.display().to_string(),
                    source,
                })?;
            }
            None => {
                // Legacy workflow command for runners without a state file
                println!("::save-state name={}::{}", key, value);
            }
        }
        self.written.insert(key.to_string(), value.to_string());
        debug!("Saved state {}", key);
        Ok(())
    }

    fn get(&self, key: &str) -> Option<String> {
        self.written
            .get(key)
            .cloned()
            .or_else(|| std::env::var(format!("STATE_{}", key)).ok())
            .filter(|v| !v.is_empty())
    }
}

/// JSON-file backed state
#[derive(Debug)]
pub struct FileStateStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl FileStateStore {
    /// Open a state file, treating a missing file as empty state
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let values = match std::fs::read_to_string(&path) {
            Ok(content) if content.trim().is_empty() => BTreeMap::new(),
            Ok(content) => {
                serde_json::from_str(&content).map_err(|e| StateError::Parsing {
                    path: path.display().to_string(),
                    message: e.to_string(),
                })?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => {
                return Err(StateError::Io {
                    path: path.display().to_string(),
                    source,
                }
                .into())
            }
        };
        debug!("Loaded {} state entries", values.len());
        Ok(Self { path, values })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(&self.values)?;
        // Write atomically via temp file + rename
        let temp_path = self.path.with_extension("tmp");
        std::fs::write(&temp_path, content)?;
        std::fs::rename(&temp_path, &self.path)
    }
}

impl StateStore for FileStateStore {
    fn save(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        self.persist().map_err(|source| StateError::Io {
            path: self.path.display().to_string(),
            source,
        })?;
        Ok(())
    }

    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).filter(|v| !v.is_empty()).cloned()
    }
}

/// In-memory state
#[derive(Debug, Clone, Default)]
pub struct MemoryStateStore {
    values: BTreeMap<String, String>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All stored entries
    pub fn entries(&self) -> &BTreeMap<String, String> {
        &self.values
    }
}

impl StateStore for MemoryStateStore {
    fn save(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).filter(|v| !v.is_empty()).cloned()
    }
}

/// Write-once-per-field view used by setup
pub struct StateRecorder<'a> {
    store: &'a mut dyn StateStore,
    written: HashSet<&'static str>,
}

impl<'a> StateRecorder<'a> {
    pub fn new(store: &'a mut dyn StateStore) -> Self {
        Self {
            store,
            written: HashSet::new(),
        }
    }

    /// Persist a field; a second write of the same field is ignored
    pub fn record(&mut self, key: &'static str, value: &str) -> Result<()> {
        if !self.written.insert(key) {
            warn!("State field {} already recorded; keeping first value", key);
            return Ok(());
        }
        self.store.save(key, value)
    }

    pub fn record_phase_marker(&mut self) -> Result<()> {
        self.record(keys::IS_POST, "true")
    }

    pub fn record_mode(&mut self, mode: ExecutionMode) -> Result<()> {
        self.record(keys::STANDALONE, bool_str(mode.is_standalone()))
    }

    pub fn record_builder_name(&mut self, name: &str) -> Result<()> {
        self.record(keys::BUILDER_NAME, name)
    }

    pub fn record_credentials_dir(&mut self, dir: &Path) -> Result<()> {
        self.record(keys::CREDENTIALS_DIR, &dir.to_string_lossy())
    }

    pub fn record_container_name(&mut self, name: &str) -> Result<()> {
        self.record(keys::CONTAINER_NAME, name)
    }

    pub fn record_debug(&mut self) -> Result<()> {
        self.record(keys::DEBUG, "true")
    }

    pub fn record_cleanup(&mut self, enabled: bool) -> Result<()> {
        self.record(keys::CLEANUP, bool_str(enabled))
    }
}

fn bool_str(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

/// Snapshot of everything setup recorded, as read by cleanup
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrossPhaseState {
    /// Recorded execution mode flag
    pub standalone: Option<bool>,
    /// Builder identity
    pub builder_name: Option<String>,
    /// Credentials directory
    pub credentials_dir: Option<PathBuf>,
    /// BuildKit container name (isolated-container driver only)
    pub container_name: Option<String>,
    /// Debug log capture requested
    pub debug: bool,
    /// Teardown enabled (default when unrecorded)
    pub cleanup: bool,
}

impl Default for CrossPhaseState {
    fn default() -> Self {
        Self {
            standalone: None,
            builder_name: None,
            credentials_dir: None,
            container_name: None,
            debug: false,
            cleanup: true,
        }
    }
}

impl CrossPhaseState {
    /// Read all fields from a store
    pub fn load(store: &dyn StateStore) -> Self {
        let flag = |key: &str| store.get(key).map(|v| v.eq_ignore_ascii_case("true"));

        Self {
            standalone: flag(keys::STANDALONE),
            builder_name: store.get(keys::BUILDER_NAME),
            credentials_dir: store.get(keys::CREDENTIALS_DIR).map(PathBuf::from),
            container_name: store.get(keys::CONTAINER_NAME),
            debug: flag(keys::DEBUG).unwrap_or(false),
            cleanup: flag(keys::CLEANUP).unwrap_or(true),
        }
    }

    /// Execution mode recorded by setup; host-engine when unrecorded
    pub fn mode(&self) -> ExecutionMode {
        ExecutionMode::from_standalone_flag(self.standalone.unwrap_or(false))
    }
}

/// Whether setup has already run in this job
pub fn is_post_phase(store: &dyn StateStore) -> bool {
    store.get(keys::IS_POST).is_some()
}
