//! # Access-Gate Runtime
//!
//! ## Startup Sequence
//!
//! 1. Load and validate configuration from the environment
//! 2. Initialize logging
//! 3. Open the store and wire the subsystems
//! 4. Start the dispatcher and reconciliation tasks
//! 5. Run until Ctrl+C, then shut down

use anyhow::{Context, Result};
use gate_runtime::notify::LogTransport;
use gate_runtime::{telemetry, GateConfig, GateContainer, GateRuntime};
use shared_types::InMemoryLedger;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let config = GateConfig::from_env().context("reading configuration")?;
    telemetry::init_tracing(&config.log)?;

    // The external ledger service is not part of this process; the in-memory
    // ledger stands in for single-process deployments.
    let ledger = Arc::new(InMemoryLedger::new());
    let container = GateContainer::build(config, ledger).context("building subsystems")?;

    let runtime = GateRuntime::new(container, Arc::new(LogTransport));
    runtime.start().await?;

    info!("Runtime is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c()
        .await
        .context("waiting for Ctrl+C")?;

    runtime.shutdown().await;
    Ok(())
}
