//! Error types and handling
//!
//! The error taxonomy is structured with specific error enums for each domain
//! (Configuration, Command, Toolchain, Inspect, State) that are then wrapped in
//! the main RiggerError enum for unified error handling.
//!
//! Cleanup never surfaces these as failures; it downgrades them to
//! [`Diagnostic`](crate::lifecycle::cleanup::Diagnostic) entries instead.

use thiserror::Error;

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Input value could not be parsed
    #[error("Invalid input '{name}': {message}")]
    InvalidInput { name: String, message: String },

    /// Unknown driver kind
    #[error("Unknown driver: {0}. Supported drivers: docker, docker-container, kubernetes, remote")]
    UnknownDriver(String),

    /// Operation needs a reachable host container engine
    #[error("{operation} requires the Docker CLI, which is not available (standalone mode)")]
    RequiresHostEngine { operation: String },

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    NotFound { path: String },

    /// Inline configuration is not valid TOML
    #[error("Failed to parse inline configuration: {message}")]
    Parsing { message: String },

    /// Configuration file I/O error
    #[error("Failed to write configuration file")]
    Io(#[from] std::io::Error),
}

/// External command errors
#[derive(Error, Debug)]
pub enum CommandError {
    /// The program could not be started
    #[error("Failed to execute {program}: {message}")]
    Spawn { program: String, message: String },

    /// The program exited unsuccessfully
    #[error("Command `{command}` failed with exit code {code}: {stderr}")]
    Failed {
        command: String,
        code: i32,
        stderr: String,
    },

    /// Task join error while waiting on a blocking command
    #[error("Task join error: {0}")]
    Join(String),
}

/// Tool acquisition errors
#[derive(Error, Debug)]
pub enum ToolchainError {
    /// Release metadata or binary could not be fetched
    #[error("Failed to download {what}: {message}")]
    Download { what: String, message: String },

    /// No release asset exists for this host
    #[error("Unsupported platform for release download: {os}/{arch}")]
    UnsupportedPlatform { os: String, arch: String },

    /// Build from source produced no binary
    #[error("Build from {source_ref} produced no binary at {path}")]
    MissingArtifact { source_ref: String, path: String },

    /// No home directory to derive the config home from
    #[error("Unable to determine home directory")]
    NoHomeDirectory,

    /// Filesystem error while placing the binary
    #[error("Failed to install binary")]
    Io(#[from] std::io::Error),
}

/// Builder inspection errors
#[derive(Error, Debug)]
pub enum InspectError {
    /// Inspection listed no nodes
    #[error("Builder {name} has no nodes")]
    NoNodes { name: String },

    /// Driver line missing from output
    #[error("Builder {name} reported no driver")]
    NoDriver { name: String },
}

/// Cross-phase state errors
#[derive(Error, Debug)]
pub enum StateError {
    /// State file could not be written or read
    #[error("Failed to access state file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// State file content is corrupt
    #[error("Failed to parse state file {path}: {message}")]
    Parsing { path: String, message: String },
}

/// Main error enum wrapping all domain-specific errors
#[derive(Error, Debug)]
pub enum RiggerError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// External command errors
    #[error("Command error: {0}")]
    Command(#[from] CommandError),

    /// Tool acquisition errors
    #[error("Toolchain error: {0}")]
    Toolchain(#[from] ToolchainError),

    /// Inspection errors
    #[error("Inspect error: {0}")]
    Inspect(#[from] InspectError),

    /// Cross-phase state errors
    #[error("State error: {0}")]
    State(#[from] StateError),

    /// Filesystem errors outside a more specific domain
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RiggerError {
    /// Whether this is a configuration error (fails before any command is issued)
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

/// Convenience type alias for Results with RiggerError
pub type Result<T> = std::result::Result<T, RiggerError>;
