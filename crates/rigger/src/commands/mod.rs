//! Command implementations
//!
//! This module contains implementations for all CLI subcommands.

pub mod cleanup;
pub mod run;
pub mod setup;
