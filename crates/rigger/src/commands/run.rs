//! Phase-dispatching entry point
//!
//! The same binary runs as the main step and as the post-job step. Setup
//! records the phase marker first, so the post-job invocation sees it and
//! runs cleanup instead.

use crate::cli::SetupArgs;
use anyhow::Result;
use rigger_core::state::{is_post_phase, StateStore};
use tracing::debug;

/// Execute the run command
pub async fn execute_run(inputs: SetupArgs, state: &mut dyn StateStore) -> Result<()> {
    if is_post_phase(state) {
        debug!("Phase marker present; running cleanup");
        super::cleanup::execute_cleanup(state).await
    } else {
        debug!("No phase marker; running setup");
        super::setup::execute_setup(inputs.into_inputs()?, state).await
    }
}
