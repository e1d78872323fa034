//! nbcs Bot - Main entry point.

use anyhow::{Context, Result};
use nbcs_bot::run;
use nbcs_common::config::Config;
use nbcs_common::logging::init_logging;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::load_with_env()?;

    // Initialize logging
    init_logging(
        &config.observability.log_level,
        &config.observability.log_format,
    );

    config.validate().context("Invalid configuration")?;

    tracing::info!("nbcs Bot v{}", env!("CARGO_PKG_VERSION"));

    run(config).await
}
