//! Market Service
//!
//! Read views over the current dataset plus the operations that change
//! what the next refresh fetches.

use crate::error::{AppError, FetchError, Result};
use crate::market::currency;
use crate::market::types::{AssetRecord, CoinDetail, NewsArticle, RegionSuggestion, TrendingRecord};
use crate::market::{RankMetric, SortDirection, SortKey, SortSpec};
use crate::scheduler::{CycleOutcome, SchedulerStatus};
use crate::state::AppState;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

/// Largest `n` accepted by [`MarketService::get_top_n`]
pub const MAX_TOP_N: usize = 100;

/// Sorted and filtered table of the current dataset
#[derive(Debug, Clone, Serialize)]
pub struct MarketView {
    pub currency: String,
    pub stale: bool,
    pub updated_at: Option<DateTime<Utc>>,
    pub sort: SortSpec,
    pub filter: String,
    /// Records in the dataset before filtering
    pub total: usize,
    pub coins: Vec<AssetRecord>,
}

/// Result of a manual refresh request
#[derive(Debug, Clone, Serialize)]
pub struct RefreshResult {
    /// False when another cycle was already in flight
    pub started: bool,
    pub outcome: CycleOutcome,
}

impl From<CycleOutcome> for RefreshResult {
    fn from(outcome: CycleOutcome) -> Self {
        Self {
            started: outcome != CycleOutcome::Skipped,
            outcome,
        }
    }
}

/// Market service for business logic
pub struct MarketService;

impl MarketService {
    /// Apply `key`/`direction` to the dataset and return the records matching `query`
    pub fn get_view(
        state: &AppState,
        key: SortKey,
        direction: SortDirection,
        query: &str,
    ) -> MarketView {
        let mut dataset = state.scheduler.dataset().write();
        let coins = dataset.view(key, direction, query);

        MarketView {
            currency: dataset.currency().to_string(),
            stale: dataset.is_stale(),
            updated_at: dataset.updated_at(),
            sort: dataset.sort(),
            filter: dataset.current_filter().to_string(),
            total: dataset.len(),
            coins,
        }
    }

    /// Top `n` records by `metric` over the unfiltered dataset
    pub fn get_top_n(
        state: &AppState,
        metric: RankMetric,
        direction: SortDirection,
        n: usize,
    ) -> Vec<AssetRecord> {
        let n = n.min(MAX_TOP_N);
        state.scheduler.dataset().read().top_n(metric, direction, n)
    }

    pub fn get_trending(state: &AppState) -> Vec<TrendingRecord> {
        state.scheduler.dataset().read().trending().to_vec()
    }

    /// Headlines fetched by the last refresh cycle
    pub fn get_news(state: &AppState) -> Vec<NewsArticle> {
        state.scheduler.news()
    }

    /// Fetch extended detail for one asset in the active currency
    pub async fn get_coin_detail(state: &AppState, id: &str) -> Result<CoinDetail> {
        let id = id.trim();
        if id.is_empty() {
            return Err(AppError::NotFound("Coin id is required".to_string()));
        }

        let currency = state.scheduler.currency();
        info!("MarketService::get_coin_detail - {} ({})", id, currency);

        match state.source.fetch_coin_detail(id, &currency).await {
            Ok(detail) => Ok(detail),
            Err(FetchError::HttpStatus(404)) => {
                Err(AppError::NotFound(format!("Coin '{}' not found", id)))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Run a refresh cycle now unless one is in flight
    pub async fn refresh_now(state: &AppState) -> RefreshResult {
        state.scheduler.refresh_now().await.into()
    }

    pub fn get_status(state: &AppState) -> SchedulerStatus {
        state.scheduler.status()
    }

    pub fn get_currency(state: &AppState) -> String {
        state.scheduler.currency()
    }

    /// Persist a new quote currency and refresh with it
    pub async fn set_currency(state: &AppState, code: &str) -> Result<RefreshResult> {
        let code = state.sqlite.set_currency(code)?;
        let outcome = state.scheduler.set_currency(&code).await;
        Ok(outcome.into())
    }

    /// Suggest a currency from the caller's region. Lookup failures yield an
    /// empty suggestion.
    pub async fn suggest_currency(state: &AppState) -> RegionSuggestion {
        match state.source.detect_country().await {
            Ok(country) => {
                let currency = currency::currency_for_country(&country).map(str::to_string);
                info!("Region {} suggests currency {:?}", country, currency);
                RegionSuggestion {
                    country: Some(country),
                    currency,
                }
            }
            Err(e) => {
                warn!("Region lookup failed: {}", e);
                RegionSuggestion {
                    country: None,
                    currency: None,
                }
            }
        }
    }

    /// Record the onboarding choice. A chosen currency is applied first.
    pub async fn complete_onboarding(
        state: &AppState,
        currency: Option<&str>,
    ) -> Result<Option<RefreshResult>> {
        let refreshed = match currency {
            Some(code) => Some(Self::set_currency(state, code).await?),
            None => None,
        };
        state.sqlite.mark_onboarding_seen()?;
        info!("Onboarding completed");
        Ok(refreshed)
    }

    /// First-run region detection. Returns the adopted currency, if any.
    pub async fn run_onboarding(state: &AppState) -> Result<Option<String>> {
        if state.sqlite.has_seen_onboarding()? {
            return Ok(None);
        }

        let suggestion = Self::suggest_currency(state).await;
        let adopted = match suggestion.currency {
            Some(code) => {
                let code = state.sqlite.set_currency(&code)?;
                state.scheduler.use_currency(&code);
                Some(code)
            }
            None => None,
        };

        state.sqlite.mark_onboarding_seen()?;
        Ok(adopted)
    }
}
