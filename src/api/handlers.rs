//! REST API endpoint handlers
//!
//! Thin adapters from HTTP to the services layer. Every response uses the
//! [`ApiResponse`] envelope.

use crate::alerts::AlertRecord;
use crate::api::types::*;
use crate::market::currency;
use crate::market::types::{AssetRecord, CoinDetail, NewsArticle, RegionSuggestion, TrendingRecord};
use crate::market::{RankMetric, SortDirection, SortKey};
use crate::notify::Notification;
use crate::scheduler::SchedulerStatus;
use crate::services::{AlertService, MarketService, MarketView, RefreshResult};
use crate::state::AppState;
use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::info;

type AppStateRef = State<Arc<AppState>>;

// ============================================================================
// Health Check
// ============================================================================

/// GET /health or GET /
pub async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::<Empty>::success_with_message("Coinwatch API is running"))
}

// ============================================================================
// Market data
// ============================================================================

/// GET /api/v1/coins?sort=&dir=&q=
pub async fn get_coins(
    State(state): AppStateRef,
    Query(params): Query<ViewQuery>,
) -> ApiResult<MarketView> {
    let key: SortKey = params.sort.parse()?;
    let direction: SortDirection = params.dir.parse()?;

    let view = MarketService::get_view(&state, key, direction, &params.q);
    Ok(Json(ApiResponse::success_with_data(view)))
}

/// GET /api/v1/top?metric=&dir=&n=
pub async fn get_top(
    State(state): AppStateRef,
    Query(params): Query<TopQuery>,
) -> ApiResult<Vec<AssetRecord>> {
    let metric: RankMetric = params.metric.parse()?;
    let direction = if params.dir.trim().is_empty() {
        SortDirection::Desc
    } else {
        params.dir.parse()?
    };

    let coins = MarketService::get_top_n(&state, metric, direction, params.n);
    Ok(Json(ApiResponse::success_with_data(coins)))
}

/// GET /api/v1/trending
pub async fn get_trending(State(state): AppStateRef) -> ApiResult<Vec<TrendingRecord>> {
    Ok(Json(ApiResponse::success_with_data(MarketService::get_trending(&state))))
}

/// GET /api/v1/news
pub async fn get_news(State(state): AppStateRef) -> ApiResult<Vec<NewsArticle>> {
    Ok(Json(ApiResponse::success_with_data(MarketService::get_news(&state))))
}

/// GET /api/v1/coins/:id
pub async fn get_coin_detail(
    State(state): AppStateRef,
    Path(id): Path<String>,
) -> ApiResult<CoinDetail> {
    let detail = MarketService::get_coin_detail(&state, &id).await?;
    Ok(Json(ApiResponse::success_with_data(detail)))
}

// ============================================================================
// Alerts
// ============================================================================

/// GET /api/v1/alerts
pub async fn list_alerts(State(state): AppStateRef) -> ApiResult<AlertList> {
    let alerts = AlertService::list(&state);
    Ok(Json(ApiResponse::success_with_data(AlertList {
        count: alerts.len(),
        alerts,
    })))
}

/// POST /api/v1/alerts
pub async fn create_alert(
    State(state): AppStateRef,
    Json(req): Json<CreateAlertRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AlertRecord>>), ApiError> {
    let alert = AlertService::create(&state, &req.symbol, req.price, req.name.as_deref())?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success_with_data(alert))))
}

/// DELETE /api/v1/alerts/:id
pub async fn delete_alert(State(state): AppStateRef, Path(id): Path<String>) -> ApiResult<Empty> {
    AlertService::remove(&state, &id)?;
    Ok(Json(ApiResponse::success_with_message("Alert removed")))
}

// ============================================================================
// Refresh and scheduling
// ============================================================================

/// POST /api/v1/refresh
pub async fn refresh(State(state): AppStateRef) -> ApiResult<RefreshResult> {
    info!("Manual refresh requested");
    let result = MarketService::refresh_now(&state).await;
    Ok(Json(ApiResponse::success_with_data(result)))
}

/// GET /api/v1/status
pub async fn get_status(State(state): AppStateRef) -> ApiResult<SchedulerStatus> {
    Ok(Json(ApiResponse::success_with_data(MarketService::get_status(&state))))
}

/// POST /api/v1/scheduler/pause
pub async fn pause_scheduler(State(state): AppStateRef) -> ApiResult<SchedulerStatus> {
    state.scheduler.pause();
    Ok(Json(ApiResponse::success_with_data(state.scheduler.status())))
}

/// POST /api/v1/scheduler/resume
pub async fn resume_scheduler(State(state): AppStateRef) -> ApiResult<SchedulerStatus> {
    state.scheduler.resume();
    Ok(Json(ApiResponse::success_with_data(state.scheduler.status())))
}

// ============================================================================
// Currency and region
// ============================================================================

fn currency_data(code: String) -> CurrencyData {
    CurrencyData {
        symbol: currency::symbol_for(&code).to_string(),
        currency: code,
        supported: currency::supported().map(str::to_string).collect(),
    }
}

/// GET /api/v1/currency
pub async fn get_currency(State(state): AppStateRef) -> ApiResult<CurrencyData> {
    let code = MarketService::get_currency(&state);
    Ok(Json(ApiResponse::success_with_data(currency_data(code))))
}

/// PUT /api/v1/currency
pub async fn put_currency(
    State(state): AppStateRef,
    Json(req): Json<CurrencyRequest>,
) -> ApiResult<CurrencyData> {
    MarketService::set_currency(&state, &req.currency).await?;
    let code = MarketService::get_currency(&state);
    Ok(Json(ApiResponse::success_with_data(currency_data(code))))
}

/// GET /api/v1/region
pub async fn get_region(State(state): AppStateRef) -> ApiResult<RegionSuggestion> {
    let suggestion = MarketService::suggest_currency(&state).await;
    Ok(Json(ApiResponse::success_with_data(suggestion)))
}

/// POST /api/v1/onboarding
pub async fn complete_onboarding(
    State(state): AppStateRef,
    Json(req): Json<OnboardingRequest>,
) -> ApiResult<CurrencyData> {
    MarketService::complete_onboarding(&state, req.currency.as_deref()).await?;
    let code = MarketService::get_currency(&state);
    Ok(Json(ApiResponse::success_with_data(currency_data(code))))
}

// ============================================================================
// Notifications
// ============================================================================

/// GET /api/v1/notifications
pub async fn get_notifications(State(state): AppStateRef) -> ApiResult<Vec<Notification>> {
    Ok(Json(ApiResponse::success_with_data(state.notifications.recent())))
}
