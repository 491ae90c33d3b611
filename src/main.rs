//! FX Sentiment Aggregator — Binary Entrypoint
//! Boots the scan cycles and the diagnostic Axum server.

use std::sync::Arc;

use fx_sentiment_aggregator::metrics::Metrics;
use fx_sentiment_aggregator::{api, AppConfig, IntelService};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op in production environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = AppConfig::from_env()?;
    let metrics = Metrics::init();

    let service = IntelService::connect(cfg.clone()).await?;
    service.start();

    let router = api::create_router(service.clone()).merge(metrics.router());
    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    tracing::info!(addr = %cfg.bind_addr, "diagnostic api listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal(service.clone()))
        .await?;

    // In-flight cycles finish before the process exits.
    service.join_loops().await;
    Ok(())
}

/// Ctrl-C halts scheduling; in-flight cycles finish before the process exits.
async fn shutdown_signal(service: Arc<IntelService>) {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
    service.stop();
}
