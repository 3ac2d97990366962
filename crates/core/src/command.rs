//! Builder-tool command construction
//!
//! Every builder-tool invocation goes through [`command_for`], which knows how
//! the tool is reached in each [`ExecutionMode`]. Nothing here executes
//! anything; see [`crate::exec`] for that.

use crate::mode::ExecutionMode;
use std::fmt;

/// Standalone builder-tool binary
pub const TOOL_BINARY: &str = "buildx";

/// Host engine CLI binary
pub const ENGINE_BINARY: &str = "docker";

/// Sub-command under which the host engine exposes the builder tool
pub const ENGINE_PREFIX: &str = "buildx";

/// A concrete program invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    /// Program to execute
    pub program: String,
    /// Arguments passed to the program
    pub args: Vec<String>,
}

impl ToolCommand {
    /// Create a command for an arbitrary program
    pub fn new<S: Into<String>>(program: S, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// A command invoking the host engine directly (no builder-tool prefix)
    pub fn engine<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(ENGINE_BINARY, args.into_iter().map(Into::into).collect())
    }

    /// True when `args` starts with the given tokens
    pub fn args_start_with(&self, prefix: &[&str]) -> bool {
        self.args.len() >= prefix.len() && self.args.iter().zip(prefix).all(|(a, p)| a == p)
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Build the invocation for a builder-tool sub-command
///
/// ```rust
/// use rigger_core::command::command_for;
/// use rigger_core::mode::ExecutionMode;
///
/// let cmd = command_for(["rm", "builder-1"], ExecutionMode::HostEngine);
/// assert_eq!(cmd.program, "docker");
/// assert_eq!(cmd.args, vec!["buildx", "rm", "builder-1"]);
///
/// let cmd = command_for(["rm", "builder-1"], ExecutionMode::Standalone);
/// assert_eq!(cmd.program, "buildx");
/// assert_eq!(cmd.args, vec!["rm", "builder-1"]);
/// ```
pub fn command_for<I, S>(sub_args: I, mode: ExecutionMode) -> ToolCommand
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let sub_args = sub_args.into_iter().map(Into::into);
    match mode {
        ExecutionMode::Standalone => ToolCommand::new(TOOL_BINARY, sub_args.collect()),
        ExecutionMode::HostEngine => ToolCommand::new(
            ENGINE_BINARY,
            std::iter::once(ENGINE_PREFIX.to_string())
                .chain(sub_args)
                .collect(),
        ),
    }
}
