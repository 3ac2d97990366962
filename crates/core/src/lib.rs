//! Core library for the rigger builder orchestrator
//!
//! This crate contains the builder lifecycle (setup and cleanup), version
//! negotiation, command construction, cross-phase state, and the collaborator
//! traits that connect the lifecycle to processes, the host engine, and the
//! job runner.

pub mod command;
pub mod config_file;
pub mod credentials;
pub mod driver;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod inputs;
pub mod inspect;
pub mod lifecycle;
pub mod logging;
pub mod mock;
pub mod mode;
pub mod outputs;
pub mod runner_env;
pub mod state;
pub mod toolchain;
pub mod version;

/// Get the version of the core library
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
