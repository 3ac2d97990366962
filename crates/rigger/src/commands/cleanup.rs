//! Cleanup command implementation

use anyhow::Result;
use rigger_core::exec::CliRunner;
use rigger_core::lifecycle::run_cleanup;
use rigger_core::state::{CrossPhaseState, StateStore};
use tracing::{debug, info, instrument};

/// Execute the cleanup command
///
/// Always succeeds once state has been read; failed steps are reported as
/// job-runner warnings.
#[instrument(skip_all)]
pub async fn execute_cleanup(state: &dyn StateStore) -> Result<()> {
    let recorded = CrossPhaseState::load(state);
    debug!("Recorded state: {}", serde_json::to_string(&recorded)?);

    let report = run_cleanup(&CliRunner::new(), &recorded).await;
    for diagnostic in &report.diagnostics {
        println!("::warning::{}: {}", diagnostic.step, diagnostic.message);
    }

    info!(
        "Cleanup finished: {} action(s), {} warning(s)",
        report.actions.len(),
        report.diagnostics.len()
    );
    Ok(())
}
