//! Best-effort durable copy of the last good market data

use crate::db::{KvStore, KEY_SNAPSHOT};
use crate::error::StorageError;
use crate::market::types::Snapshot;
use std::sync::Arc;
use tracing::{debug, warn};

/// Sole reader and writer of the `snapshot` key
#[derive(Clone)]
pub struct SnapshotStore {
    kv: Arc<dyn KvStore>,
}

impl SnapshotStore {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    /// Overwrite the stored snapshot with `snapshot`
    pub fn save(&self, snapshot: &Snapshot) -> Result<(), StorageError> {
        let payload = serde_json::to_string(snapshot)
            .map_err(|e| StorageError::WriteFailed(e.to_string()))?;
        self.kv.put(KEY_SNAPSHOT, &payload)?;

        debug!(
            "Saved snapshot: {} coins, {} trending, {} bytes",
            snapshot.coins.len(),
            snapshot.trending.len(),
            payload.len()
        );
        Ok(())
    }

    /// Stored snapshot, or `None` when absent, unreadable or corrupt
    pub fn load(&self) -> Option<Snapshot> {
        let payload = match self.kv.get(KEY_SNAPSHOT) {
            Ok(Some(payload)) => payload,
            Ok(None) => return None,
            Err(e) => {
                warn!("Snapshot load failed: {}", e);
                return None;
            }
        };

        match serde_json::from_str::<Snapshot>(&payload) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!("Ignoring corrupt snapshot: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::SqliteDb;
    use crate::market::types::{AssetRecord, TrendingRecord};

    fn store() -> (Arc<SqliteDb>, SnapshotStore) {
        let db = Arc::new(SqliteDb::open_in_memory().unwrap());
        let store = SnapshotStore::new(db.clone());
        (db, store)
    }

    fn record(id: &str, price: Option<f64>) -> AssetRecord {
        AssetRecord {
            id: id.to_string(),
            symbol: id.to_string(),
            name: id.to_uppercase(),
            current_price: price,
            market_cap: Some(1.5e9),
            total_volume: None,
            rank: Some(7),
            pct_change_1h: Some(-0.25),
            pct_change_24h: None,
            pct_change_7d: Some(3.0),
            image_url: Some(format!("https://img.example.invalid/{}.png", id)),
        }
    }

    #[test]
    fn test_save_then_load_preserves_coins() {
        let (_db, store) = store();
        let snapshot = Snapshot::new(
            "gbp",
            vec![record("btc", Some(60000.0)), record("eth", None)],
            vec![TrendingRecord {
                id: "pepe".to_string(),
                name: "Pepe".to_string(),
                symbol: "PEPE".to_string(),
                small: None,
                score: Some(0),
            }],
        );

        store.save(&snapshot).unwrap();
        let loaded = store.load().unwrap();

        assert_eq!(loaded.coins, snapshot.coins);
        assert_eq!(loaded.trending, snapshot.trending);
        assert_eq!(loaded.currency, "gbp");
        assert_eq!(
            loaded.timestamp.map(|t| t.timestamp_millis()),
            snapshot.timestamp.map(|t| t.timestamp_millis())
        );
    }

    #[test]
    fn test_save_overwrites_previous() {
        let (_db, store) = store();
        store.save(&Snapshot::new("usd", vec![record("btc", Some(1.0))], vec![])).unwrap();
        store.save(&Snapshot::new("usd", vec![record("eth", Some(2.0))], vec![])).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.coins.len(), 1);
        assert_eq!(loaded.coins[0].id, "eth");
    }

    #[test]
    fn test_absent_snapshot_is_none() {
        let (_db, store) = store();
        assert!(store.load().is_none());
    }

    #[test]
    fn test_corrupt_or_incomplete_snapshot_is_none() {
        let (db, store) = store();

        db.put(KEY_SNAPSHOT, "{not json").unwrap();
        assert!(store.load().is_none());

        db.put(KEY_SNAPSHOT, r#"{"timestamp": 1700000000000, "currency": "usd"}"#).unwrap();
        assert!(store.load().is_none());

        db.put(KEY_SNAPSHOT, r#"{"coins": null}"#).unwrap();
        assert!(store.load().is_none());
    }
}
