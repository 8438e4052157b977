//! Application state management

use crate::alerts::AlertEngine;
use crate::config::AppConfig;
use crate::db::sqlite::SqliteDb;
use crate::db::SnapshotStore;
use crate::error::Result;
use crate::gateway::RequestGateway;
use crate::market::{CoinGeckoSource, MarketSource};
use crate::notify::NotificationLog;
use crate::scheduler::SyncScheduler;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Notifications kept for polling consumers
const NOTIFICATION_CAPACITY: usize = 64;

/// Application state shared by the runtime and the API server
pub struct AppState {
    pub config: AppConfig,

    /// SQLite key/value store
    pub sqlite: Arc<SqliteDb>,

    /// Market data provider
    pub source: Arc<dyn MarketSource>,

    /// Refresh orchestration and the current dataset
    pub scheduler: Arc<SyncScheduler>,

    /// Price alerts
    pub alerts: Arc<AlertEngine>,

    /// Recent alerts and notices
    pub notifications: Arc<NotificationLog>,

    /// Root token; cancelling it tears down every task and request
    pub cancel: CancellationToken,
}

impl AppState {
    /// Create state backed by the on-disk database and CoinGecko
    pub fn new(config: AppConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;
        tracing::info!("Data directory: {:?}", config.data_dir);

        let sqlite = Arc::new(SqliteDb::new(&config.db_path())?);
        let cancel = CancellationToken::new();
        let gateway = Arc::new(RequestGateway::new(cancel.child_token())?);
        let source: Arc<dyn MarketSource> = Arc::new(CoinGeckoSource::new(gateway, &config));

        Self::assemble(config, sqlite, source, cancel)
    }

    /// Create state around an existing database and market source
    pub fn with_source(
        config: AppConfig,
        sqlite: Arc<SqliteDb>,
        source: Arc<dyn MarketSource>,
    ) -> Result<Self> {
        Self::assemble(config, sqlite, source, CancellationToken::new())
    }

    fn assemble(
        config: AppConfig,
        sqlite: Arc<SqliteDb>,
        source: Arc<dyn MarketSource>,
        cancel: CancellationToken,
    ) -> Result<Self> {
        let currency = sqlite.get_currency()?;
        let notifications = Arc::new(NotificationLog::new(NOTIFICATION_CAPACITY));
        let alerts = Arc::new(AlertEngine::new(sqlite.clone(), notifications.clone()));
        let scheduler = Arc::new(SyncScheduler::new(
            source.clone(),
            SnapshotStore::new(sqlite.clone()),
            alerts.clone(),
            notifications.clone(),
            currency,
            cancel.child_token(),
        ));

        Ok(Self {
            config,
            sqlite,
            source,
            scheduler,
            alerts,
            notifications,
            cancel,
        })
    }

    /// Stop the timer and cancel in-flight work
    pub fn shutdown(&self) {
        self.scheduler.shutdown();
        self.cancel.cancel();
    }
}
