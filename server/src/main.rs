//! pricetag server entry point.
//!
//! Loads the config, sets up logging, and serves until Ctrl+C.

use pricetag::prelude::*;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), PricetagError> {
    let config_path = std::env::var("PRICETAG_CONFIG").unwrap_or_else(|_| "config.json".into());
    let (config, source) = ServerConfig::read(&config_path)?;

    init_logging(&config.log_level);
    if source == ConfigSource::Defaults {
        tracing::warn!(path = %config_path, "config file not found, using defaults");
    }
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_path,
        bind = %config.bind_addr,
        "starting pricetag server"
    );

    let server = PricetagServer::builder().config(&config).build().await?;
    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
            tracing::info!("Ctrl+C received");
        })
        .await
}

/// `RUST_LOG` wins over the configured level.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}
