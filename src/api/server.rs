//! HTTP server for the local REST API

use crate::api::handlers;
use crate::api::rate_limiter::{rate_limit_middleware, RateLimiterState};
use crate::error::{AppError, Result};
use crate::state::AppState;
use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::oneshot;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Requests per second for endpoints that do not reach the provider
const GENERAL_RATE_LIMIT: u32 = 100;

/// Build the API router over `state`
pub fn router(state: Arc<AppState>) -> Router {
    let rate_limiter = Arc::new(RateLimiterState::new(
        GENERAL_RATE_LIMIT,
        state.config.refresh_rate_per_sec,
    ));

    // Allow all for local consumers
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/", get(handlers::health_check))
        // Market data
        .route("/api/v1/coins", get(handlers::get_coins))
        .route("/api/v1/coins/:id", get(handlers::get_coin_detail))
        .route("/api/v1/top", get(handlers::get_top))
        .route("/api/v1/trending", get(handlers::get_trending))
        .route("/api/v1/news", get(handlers::get_news))
        // Alerts
        .route("/api/v1/alerts", get(handlers::list_alerts).post(handlers::create_alert))
        .route("/api/v1/alerts/:id", delete(handlers::delete_alert))
        // Refresh and scheduling
        .route("/api/v1/refresh", post(handlers::refresh))
        .route("/api/v1/status", get(handlers::get_status))
        .route("/api/v1/scheduler/pause", post(handlers::pause_scheduler))
        .route("/api/v1/scheduler/resume", post(handlers::resume_scheduler))
        // Currency and region
        .route("/api/v1/currency", get(handlers::get_currency).put(handlers::put_currency))
        .route("/api/v1/region", get(handlers::get_region))
        .route("/api/v1/onboarding", post(handlers::complete_onboarding))
        .route("/api/v1/notifications", get(handlers::get_notifications))
        .with_state(state)
        .layer(middleware::from_fn_with_state(rate_limiter, rate_limit_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// API server manager
pub struct ApiServer {
    state: Arc<AppState>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl ApiServer {
    pub fn new(state: Arc<AppState>) -> Self {
        Self {
            state,
            shutdown_tx: None,
        }
    }

    /// Bind and serve in the background. Returns the bound address, which
    /// differs from the configured one when port 0 is requested.
    pub async fn start(&mut self) -> Result<Option<SocketAddr>> {
        let config = &self.state.config;
        if !config.api_enabled {
            info!("API server is disabled");
            return Ok(None);
        }

        let addr: SocketAddr = format!("{}:{}", config.api_host, config.api_port)
            .parse()
            .map_err(|e| AppError::Config(format!("Invalid address: {}", e)))?;

        let listener = tokio::net::TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        let app = router(self.state.clone());

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        self.shutdown_tx = Some(shutdown_tx);

        tokio::spawn(async move {
            let server = axum::serve(listener, app).with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                info!("API server shutting down");
            });

            if let Err(e) = server.await {
                error!("API server error: {}", e);
            }
        });

        info!("Coinwatch API listening on http://{}", local_addr);
        info!("  GET  /api/v1/coins?sort=&dir=&q=");
        info!("  GET  /api/v1/top?metric=&dir=&n=");
        info!("  POST /api/v1/refresh");
        info!("  GET  /api/v1/alerts  POST /api/v1/alerts  DELETE /api/v1/alerts/:id");

        Ok(Some(local_addr))
    }

    /// Stop the server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
            info!("API server stop signal sent");
        }
    }
}

impl Drop for ApiServer {
    fn drop(&mut self) {
        self.stop();
    }
}
