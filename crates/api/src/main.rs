//! HAR Service - Main Entry Point

use anyhow::Context;
use api::{init_logging, run_server, Settings};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("failed to load configuration")?;
    init_logging(&settings.log)?;

    info!("=== HAR Service v{} ===", env!("CARGO_PKG_VERSION"));
    info!(
        "Model {}, window {} / overlap {} at {} Hz",
        settings.model.path,
        settings.pipeline.window_size,
        settings.pipeline.overlap,
        settings.pipeline.sample_rate
    );

    run_server(settings).await?;

    Ok(())
}
