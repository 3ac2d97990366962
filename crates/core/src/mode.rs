//! Execution mode: standalone builder tool vs. host-engine plugin
//!
//! Resolved once during setup, persisted to cross-phase state, and consulted by
//! the command builder and every conditional lifecycle step.

/// Whether a host container engine is reachable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// No host engine; the builder tool binary is invoked directly
    Standalone,
    /// The builder tool runs as a sub-command of the host engine CLI
    HostEngine,
}

impl ExecutionMode {
    /// Derive the mode from a host-engine reachability probe
    pub fn from_engine_available(available: bool) -> Self {
        if available {
            Self::HostEngine
        } else {
            Self::Standalone
        }
    }

    /// Recover the mode from its persisted `standalone` flag
    pub fn from_standalone_flag(standalone: bool) -> Self {
        if standalone {
            Self::Standalone
        } else {
            Self::HostEngine
        }
    }

    pub fn is_standalone(&self) -> bool {
        matches!(self, Self::Standalone)
    }
}

impl std::fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Standalone => write!(f, "standalone"),
            Self::HostEngine => write!(f, "host-engine"),
        }
    }
}
