//! Persisted price alerts
//!
//! Each alert moves `Active -> Triggered -> Removed` and never goes back.
//! The engine is the only writer of the `alerts` key.

use crate::db::{KvStore, KEY_ALERTS};
use crate::error::{StorageError, ValidationError};
use crate::market::currency::format_price;
use crate::market::Dataset;
use crate::notify::Notifier;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// User-defined price threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertRecord {
    pub id: String,
    /// Lowercase ticker symbol
    pub coin_symbol: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coin_name: Option<String>,
    pub target_price: f64,
    pub created_at: DateTime<Utc>,
}

impl AlertRecord {
    /// Name used in notifications, falling back to the upper-cased symbol
    pub fn display_name(&self) -> String {
        match &self.coin_name {
            Some(name) if !name.trim().is_empty() => name.clone(),
            _ => self.coin_symbol.to_uppercase(),
        }
    }

    fn is_met_by(&self, price: Option<f64>) -> bool {
        matches!(price, Some(p) if p >= self.target_price)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AlertError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<AlertError> for crate::error::AppError {
    fn from(err: AlertError) -> Self {
        match err {
            AlertError::Validation(e) => e.into(),
            AlertError::Storage(e) => e.into(),
        }
    }
}

/// Owns the alert set and evaluates it against market data
pub struct AlertEngine {
    kv: Arc<dyn KvStore>,
    notifier: Arc<dyn Notifier>,
    alerts: Mutex<Vec<AlertRecord>>,
}

impl AlertEngine {
    /// Load the persisted alert set. Unreadable or corrupt data yields an
    /// empty set.
    pub fn new(kv: Arc<dyn KvStore>, notifier: Arc<dyn Notifier>) -> Self {
        let alerts = load_alerts(kv.as_ref());
        if !alerts.is_empty() {
            info!("Loaded {} active alerts", alerts.len());
        }

        Self {
            kv,
            notifier,
            alerts: Mutex::new(alerts),
        }
    }

    /// Register a new alert for `symbol` at `target_price`
    pub fn create(
        &self,
        symbol: &str,
        target_price: f64,
        coin_name: Option<&str>,
    ) -> Result<AlertRecord, AlertError> {
        if !target_price.is_finite() || target_price <= 0.0 {
            return Err(ValidationError::InvalidAlertPrice(target_price).into());
        }
        let symbol = symbol.trim().to_lowercase();
        if symbol.is_empty() {
            return Err(ValidationError::MissingSymbol.into());
        }

        let record = AlertRecord {
            id: Uuid::new_v4().to_string(),
            coin_symbol: symbol,
            coin_name: coin_name
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_string),
            target_price,
            created_at: Utc::now(),
        };

        {
            let mut alerts = self.alerts.lock();
            let mut next = alerts.clone();
            next.push(record.clone());
            persist(self.kv.as_ref(), &next)?;
            *alerts = next;
        }

        info!(
            "Alert {} created: {} at {}",
            record.id, record.coin_symbol, record.target_price
        );
        Ok(record)
    }

    /// Delete an alert. Unknown ids are ignored.
    pub fn remove(&self, id: &str) -> Result<(), StorageError> {
        let mut alerts = self.alerts.lock();
        if !alerts.iter().any(|a| a.id == id) {
            return Ok(());
        }

        let next: Vec<AlertRecord> = alerts.iter().filter(|a| a.id != id).cloned().collect();
        persist(self.kv.as_ref(), &next)?;
        *alerts = next;

        info!("Alert {} removed", id);
        Ok(())
    }

    /// Active alerts in creation order
    pub fn list(&self) -> Vec<AlertRecord> {
        self.alerts.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.alerts.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.lock().is_empty()
    }

    /// Fire and remove every alert whose coin is at or above its target.
    ///
    /// Returns the triggered alerts. Alerts for symbols absent from the
    /// dataset, or with no current price, stay active.
    pub fn evaluate(&self, dataset: &Dataset) -> Vec<AlertRecord> {
        let triggered = {
            let mut alerts = self.alerts.lock();
            if alerts.is_empty() {
                return Vec::new();
            }

            let (triggered, remaining): (Vec<AlertRecord>, Vec<AlertRecord>) =
                alerts.drain(..).partition(|alert| {
                    dataset
                        .find_by_symbol(&alert.coin_symbol)
                        .map(|coin| alert.is_met_by(coin.current_price))
                        .unwrap_or(false)
                });
            *alerts = remaining;

            if !triggered.is_empty() {
                if let Err(e) = persist(self.kv.as_ref(), &alerts) {
                    warn!("Failed to persist alerts after trigger: {}", e);
                }
            }
            triggered
        };

        for alert in &triggered {
            let message = format!(
                "{} reached {}!",
                alert.display_name(),
                format_price(Some(alert.target_price), dataset.currency())
            );
            info!("Alert {} triggered", alert.id);
            self.notifier.notify(&message);
        }

        triggered
    }
}

fn load_alerts(kv: &dyn KvStore) -> Vec<AlertRecord> {
    let payload = match kv.get(KEY_ALERTS) {
        Ok(Some(payload)) => payload,
        Ok(None) => return Vec::new(),
        Err(e) => {
            warn!("Alert set unreadable, starting empty: {}", e);
            return Vec::new();
        }
    };

    serde_json::from_str(&payload).unwrap_or_else(|e| {
        warn!("Ignoring corrupt alert set: {}", e);
        Vec::new()
    })
}

fn persist(kv: &dyn KvStore, alerts: &[AlertRecord]) -> Result<(), StorageError> {
    let payload =
        serde_json::to_string(alerts).map_err(|e| StorageError::WriteFailed(e.to_string()))?;
    kv.put(KEY_ALERTS, &payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::SqliteDb;
    use crate::market::types::AssetRecord;
    use crate::notify::NotificationLog;

    fn coin(symbol: &str, name: &str, price: Option<f64>) -> AssetRecord {
        AssetRecord {
            id: name.to_lowercase(),
            symbol: symbol.to_string(),
            name: name.to_string(),
            current_price: price,
            market_cap: None,
            total_volume: None,
            rank: None,
            pct_change_1h: None,
            pct_change_24h: None,
            pct_change_7d: None,
            image_url: None,
        }
    }

    fn engine() -> (Arc<SqliteDb>, Arc<NotificationLog>, AlertEngine) {
        let db = Arc::new(SqliteDb::open_in_memory().unwrap());
        let log = Arc::new(NotificationLog::new(16));
        let engine = AlertEngine::new(db.clone(), log.clone());
        (db, log, engine)
    }

    #[test]
    fn test_create_rejects_bad_input() {
        let (_db, _log, engine) = engine();

        for price in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let err = engine.create("btc", price, None).unwrap_err();
            assert!(matches!(
                err,
                AlertError::Validation(ValidationError::InvalidAlertPrice(_))
            ));
        }
        assert!(matches!(
            engine.create("  ", 10.0, None).unwrap_err(),
            AlertError::Validation(ValidationError::MissingSymbol)
        ));
        assert!(engine.is_empty());
    }

    #[test]
    fn test_create_persists_lowercased_symbol() {
        let (db, _log, engine) = engine();
        let alert = engine.create("BTC", 65000.0, Some("Bitcoin")).unwrap();
        assert_eq!(alert.coin_symbol, "btc");

        let reloaded = AlertEngine::new(db, Arc::new(NotificationLog::new(1)));
        assert_eq!(reloaded.list(), vec![alert]);
    }

    #[test]
    fn test_evaluate_triggers_once_and_removes() {
        let (db, log, engine) = engine();
        engine.create("BTC", 65000.0, Some("Bitcoin")).unwrap();
        engine.create("eth", 5000.0, None).unwrap();

        let dataset = Dataset::fresh(
            "usd",
            vec![
                coin("btc", "Bitcoin", Some(65000.0)),
                coin("eth", "Ethereum", Some(3000.0)),
            ],
            vec![],
        );

        let fired = engine.evaluate(&dataset);
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].coin_symbol, "btc");

        assert!(engine.evaluate(&dataset).is_empty());

        let notifications = log.recent();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].message, "Bitcoin reached $65,000!");

        let reloaded = AlertEngine::new(db, Arc::new(NotificationLog::new(1)));
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.list()[0].coin_symbol, "eth");
    }

    #[test]
    fn test_evaluate_keeps_alerts_without_price() {
        let (_db, log, engine) = engine();
        engine.create("eth", 1.0, None).unwrap();
        engine.create("doge", 1.0, None).unwrap();

        let dataset = Dataset::fresh("usd", vec![coin("eth", "Ethereum", None)], vec![]);
        assert!(engine.evaluate(&dataset).is_empty());
        assert_eq!(engine.len(), 2);
        assert!(log.recent().is_empty());
    }

    #[test]
    fn test_remove_is_idempotent() {
        let (_db, _log, engine) = engine();
        let alert = engine.create("sol", 200.0, None).unwrap();

        engine.remove(&alert.id).unwrap();
        engine.remove(&alert.id).unwrap();
        engine.remove("no-such-id").unwrap();
        assert!(engine.is_empty());
    }

    #[test]
    fn test_corrupt_alert_set_loads_empty() {
        let db = Arc::new(SqliteDb::open_in_memory().unwrap());
        db.put(KEY_ALERTS, "[{\"id\": 1").unwrap();

        let engine = AlertEngine::new(db, Arc::new(NotificationLog::new(1)));
        assert!(engine.is_empty());
    }
}
