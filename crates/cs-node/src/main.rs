//! Composition service entry point.

use anyhow::{Context, Result};
use cs_node::{CompositionNode, ServiceConfig};
use cs_telemetry::{init_telemetry, log_event};

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServiceConfig::load().context("Failed to load configuration")?;
    let _telemetry = init_telemetry(&config.telemetry).context("Failed to initialize telemetry")?;

    let mut node = CompositionNode::build(config)?;
    let addr = node.start().await?;

    log_event!(
        info,
        "runtime",
        "Composition service is running. Press Ctrl+C to stop.",
        addr = %addr
    );
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;

    node.shutdown().await?;
    Ok(())
}
