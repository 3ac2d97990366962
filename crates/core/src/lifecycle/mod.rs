//! Builder lifecycle orchestration
//!
//! [`setup`] provisions the builder and records what it created; [`cleanup`]
//! runs in a later process and undoes it using only the recorded state.

pub mod cleanup;
pub mod setup;

pub use cleanup::{run_cleanup, CleanupReport, CleanupStep, Diagnostic};
pub use setup::{Setup, SetupOutcome};
