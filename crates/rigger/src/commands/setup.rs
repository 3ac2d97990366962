//! Setup command implementation
//!
//! Wires the process-backed collaborators into the core setup sequence.

use anyhow::Result;
use rigger_core::credentials::TlsCredentials;
use rigger_core::engine::DockerEngine;
use rigger_core::exec::CliRunner;
use rigger_core::inputs::Inputs;
use rigger_core::lifecycle::Setup;
use rigger_core::outputs::RunnerOutputs;
use rigger_core::runner_env::RunnerEnv;
use rigger_core::state::StateStore;
use rigger_core::toolchain::CliToolchain;
use tracing::{debug, info, instrument};

/// Execute the setup command
#[instrument(skip_all)]
pub async fn execute_setup(inputs: Inputs, state: &mut dyn StateStore) -> Result<()> {
    debug!("Setup inputs: {:?}", inputs);

    let env = RunnerEnv::from_env();
    let runner = CliRunner::new();
    let engine = DockerEngine::new(&runner);
    let toolchain = CliToolchain::new(&runner, env.clone())?;
    let credentials = TlsCredentials::from_env();
    let mut outputs = RunnerOutputs::from_env();

    let outcome = Setup::new(&runner, &engine, &toolchain, &credentials, &env)
        .run(&inputs, state, &mut outputs)
        .await?;

    info!(
        "Builder {} ready ({} mode, builder tool {})",
        outcome.identity, outcome.mode, outcome.version
    );
    Ok(())
}
