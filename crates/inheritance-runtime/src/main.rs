//! # Metadata Inheritance Runtime
//!
//! Runs the inheritance listener over an in-memory repository until Ctrl+C.

use anyhow::{Context, Result};
use inheritance_runtime::{init_tracing, InheritanceRuntime, RuntimeConfig};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let config = RuntimeConfig::from_env().context("Invalid runtime configuration")?;
    init_tracing(&config).context("Failed to initialise logging")?;

    let runtime = InheritanceRuntime::new(config);
    runtime.start().await?;

    info!("Inheritance runtime is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    runtime.shutdown().await;
    Ok(())
}
