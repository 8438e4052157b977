//! Alert Service
//!
//! Handles price alert creation and removal.

use crate::alerts::AlertRecord;
use crate::error::Result;
use crate::market::currency::format_price;
use crate::notify::Notifier;
use crate::state::AppState;
use tracing::info;

/// Alert service for business logic
pub struct AlertService;

impl AlertService {
    /// Create an alert and confirm it with a notice
    pub fn create(
        state: &AppState,
        symbol: &str,
        target_price: f64,
        coin_name: Option<&str>,
    ) -> Result<AlertRecord> {
        info!("AlertService::create - {} at {}", symbol, target_price);

        let alert = state.alerts.create(symbol, target_price, coin_name)?;
        let currency = state.scheduler.currency();
        state.notifications.notice(&format!(
            "Alert set for {} at {}",
            alert.display_name(),
            format_price(Some(alert.target_price), &currency)
        ));
        Ok(alert)
    }

    pub fn list(state: &AppState) -> Vec<AlertRecord> {
        state.alerts.list()
    }

    /// Remove an alert; unknown ids succeed
    pub fn remove(state: &AppState, id: &str) -> Result<()> {
        state.alerts.remove(id)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::db::sqlite::SqliteDb;
    use crate::error::{AppError, FetchError, ValidationError};
    use crate::market::types::{AssetRecord, CoinDetail, TrendingRecord};
    use crate::market::MarketSource;
    use crate::notify::NotificationKind;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct OfflineSource;

    #[async_trait]
    impl MarketSource for OfflineSource {
        async fn fetch_markets(&self, _currency: &str) -> std::result::Result<Vec<AssetRecord>, FetchError> {
            Err(FetchError::Network("offline".to_string()))
        }

        async fn fetch_trending(&self) -> std::result::Result<Vec<TrendingRecord>, FetchError> {
            Err(FetchError::Network("offline".to_string()))
        }

        async fn fetch_coin_detail(&self, _id: &str, _currency: &str) -> std::result::Result<CoinDetail, FetchError> {
            Err(FetchError::Network("offline".to_string()))
        }

        async fn detect_country(&self) -> std::result::Result<String, FetchError> {
            Err(FetchError::Network("offline".to_string()))
        }
    }

    fn state() -> AppState {
        let sqlite = Arc::new(SqliteDb::open_in_memory().unwrap());
        AppState::with_source(AppConfig::default(), sqlite, Arc::new(OfflineSource)).unwrap()
    }

    #[test]
    fn test_create_confirms_with_notice() {
        let state = state();
        let alert = AlertService::create(&state, "ETH", 4200.5, Some("Ethereum")).unwrap();

        assert_eq!(AlertService::list(&state), vec![alert]);
        let recent = state.notifications.recent();
        assert_eq!(recent[0].kind, NotificationKind::Notice);
        assert_eq!(recent[0].message, "Alert set for Ethereum at $4,200.5");
    }

    #[test]
    fn test_create_rejects_invalid_price() {
        let state = state();
        let err = AlertService::create(&state, "btc", -5.0, None).unwrap_err();
        assert!(matches!(
            err,
            AppError::Validation(ValidationError::InvalidAlertPrice(_))
        ));
        assert!(AlertService::list(&state).is_empty());
        assert!(state.notifications.recent().is_empty());
    }

    #[test]
    fn test_remove_unknown_is_ok() {
        let state = state();
        AlertService::remove(&state, "missing").unwrap();
    }
}
