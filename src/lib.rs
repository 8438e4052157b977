//! Coinwatch - Cryptocurrency market data pipeline
//!
//! Periodically syncs market data from CoinGecko, keeps a best-effort
//! offline snapshot, evaluates price alerts and serves sorted views and
//! rankings over a local REST API.

pub mod alerts;
pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod gateway;
pub mod market;
pub mod notify;
pub mod scheduler;
pub mod services;
pub mod state;

use api::ApiServer;
use config::AppConfig;
use services::MarketService;
use state::AppState;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global tracing subscriber
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "coinwatch=debug,coinwatch_lib=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

/// Run the pipeline until ctrl-c
pub async fn run() -> anyhow::Result<()> {
    init_tracing();
    tracing::info!("Starting Coinwatch...");

    let config = AppConfig::from_env();
    let interval = config.refresh_interval();
    let state = Arc::new(AppState::new(config)?);

    if state.scheduler.warm_start() {
        tracing::info!("Showing saved data until the first refresh completes");
    }

    match MarketService::run_onboarding(&state).await {
        Ok(Some(currency)) => tracing::info!("Adopted suggested currency {}", currency),
        Ok(None) => {}
        Err(e) => tracing::warn!("Onboarding skipped: {}", e),
    }

    let mut server = ApiServer::new(state.clone());
    server.start().await?;

    let outcome = state.scheduler.refresh_cycle().await;
    tracing::info!("Initial refresh: {:?}", outcome);
    state.scheduler.start_periodic(interval);

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down...");

    server.stop();
    state.shutdown();
    Ok(())
}
