//! SRv6 Traffic Engineering - Main Entry Point

use srv6_te::{TeConfig, TeController};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("srv6-te v{}", env!("CARGO_PKG_VERSION"));

    let config_path =
        std::env::var("CONFIG_PATH").unwrap_or_else(|_| "/etc/srv6-te/config.json".into());

    let config = TeConfig::load(&config_path).unwrap_or_else(|_| {
        tracing::warn!("Config not found, using defaults");
        TeConfig::default()
    });

    let controller = Arc::new(TeController::with_defaults(config)?);

    // Stop cleanly at the next cycle boundary on ctrl-c.
    let stopper = controller.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutting down");
            stopper.shutdown();
        }
    });

    controller.run().await?;

    Ok(())
}
