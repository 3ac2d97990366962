//! BuildKit daemon configuration files
//!
//! A config file path given as input is validated and passed through as-is.
//! Inline configuration text is checked as TOML and materialised as a fresh
//! `buildkitd-XXXXXX.toml` file in the job's temp directory.

use crate::errors::{ConfigError, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

/// Resolve a config file input; the returned path equals the input
#[instrument]
pub fn get_config_file(path: &str) -> Result<PathBuf> {
    let resolved = PathBuf::from(path);
    if !resolved.is_file() {
        return Err(ConfigError::NotFound {
            path: path.to_string(),
        }
        .into());
    }
    Ok(resolved)
}

/// Materialise inline configuration text into a new file under `dir`
#[instrument(skip(text))]
pub fn get_config_inline(text: &str, dir: &Path) -> Result<PathBuf> {
    toml::from_str::<toml::Table>(text).map_err(|e| ConfigError::Parsing {
        message: e.to_string(),
    })?;

    std::fs::create_dir_all(dir).map_err(ConfigError::Io)?;
    let mut file = tempfile::Builder::new()
        .prefix("buildkitd-")
        .suffix(".toml")
        .rand_bytes(6)
        .tempfile_in(dir)
        .map_err(ConfigError::Io)?;
    file.write_all(text.as_bytes()).map_err(ConfigError::Io)?;

    let path = file
        .into_temp_path()
        .keep()
        .map_err(|e| ConfigError::Io(e.error))?;
    debug!("Materialised inline config at {}", path.display());
    Ok(path)
}
