//! Refresh cycle orchestration
//!
//! A cycle is `Idle -> Fetching -> Idle`. Only one cycle runs at a time;
//! requests that arrive while a cycle is in flight are dropped, not queued.
//! Failures fall back to the saved snapshot now and try again on the next
//! scheduled tick. There is no retry loop.

use crate::alerts::AlertEngine;
use crate::db::SnapshotStore;
use crate::error::FetchError;
use crate::market::types::NewsArticle;
use crate::market::{Dataset, MarketSource};
use crate::notify::Notifier;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Notice shown when the dataset falls back to the saved snapshot
pub const CACHED_DATA_NOTICE: &str = "Could not reach market data provider. Showing saved data.";

const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Result of one refresh cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleOutcome {
    /// Provider answered; dataset replaced and snapshot saved
    Fresh,
    /// Provider failed; dataset adopted from the saved snapshot
    Fallback,
    /// Provider failed and no usable snapshot exists
    NoData,
    /// Another cycle was already in flight
    Skipped,
    /// Shut down while fetching; dataset untouched
    Cancelled,
}

#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub outcome: CycleOutcome,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub error: Option<String>,
    pub alerts_triggered: usize,
}

/// Whether a cycle is in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    Idle,
    Fetching,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodicStatus {
    /// A timer task is live
    pub armed: bool,
    pub paused: bool,
    pub interval_ms: Option<u64>,
}

/// Point-in-time view of the scheduler for status endpoints
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerStatus {
    pub phase: Phase,
    pub currency: String,
    pub last_update: Option<DateTime<Utc>>,
    pub stale: bool,
    pub coin_count: usize,
    pub trending_count: usize,
    pub periodic: PeriodicStatus,
    pub active_alerts: usize,
    pub cycles_run: u64,
    pub last_cycle: Option<CycleReport>,
}

#[derive(Default)]
struct PeriodicState {
    interval: Option<Duration>,
    paused: bool,
    token: Option<CancellationToken>,
    handle: Option<JoinHandle<()>>,
}

impl PeriodicState {
    fn disarm(&mut self) {
        if let Some(token) = self.token.take() {
            token.cancel();
        }
        self.handle = None;
    }

    fn is_armed(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for PeriodicState {
    fn drop(&mut self) {
        self.disarm();
    }
}

/// Clears the `fetching` flag when a cycle ends, however it ends
struct FetchGuard<'a> {
    flag: &'a AtomicBool,
    idle: &'a Notify,
}

impl<'a> FetchGuard<'a> {
    fn acquire(flag: &'a AtomicBool, idle: &'a Notify) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag, idle })
    }
}

impl Drop for FetchGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
        self.idle.notify_waiters();
    }
}

/// Owns the dataset and runs refresh cycles against a [`MarketSource`]
pub struct SyncScheduler {
    source: Arc<dyn MarketSource>,
    snapshots: SnapshotStore,
    alerts: Arc<AlertEngine>,
    notifier: Arc<dyn Notifier>,
    dataset: RwLock<Dataset>,
    news: RwLock<Vec<NewsArticle>>,
    currency: RwLock<String>,
    fetching: AtomicBool,
    idle: Notify,
    cycles_run: AtomicU64,
    last_cycle: Mutex<Option<CycleReport>>,
    periodic: Mutex<PeriodicState>,
    cancel: CancellationToken,
}

impl SyncScheduler {
    pub fn new(
        source: Arc<dyn MarketSource>,
        snapshots: SnapshotStore,
        alerts: Arc<AlertEngine>,
        notifier: Arc<dyn Notifier>,
        currency: impl Into<String>,
        cancel: CancellationToken,
    ) -> Self {
        let currency = currency.into();
        Self {
            source,
            snapshots,
            alerts,
            notifier,
            dataset: RwLock::new(Dataset::empty(currency.clone())),
            news: RwLock::new(Vec::new()),
            currency: RwLock::new(currency),
            fetching: AtomicBool::new(false),
            idle: Notify::new(),
            cycles_run: AtomicU64::new(0),
            last_cycle: Mutex::new(None),
            periodic: Mutex::new(PeriodicState::default()),
            cancel,
        }
    }

    /// Current dataset. Readers take the read lock; views that change the
    /// applied sort take the write lock.
    pub fn dataset(&self) -> &RwLock<Dataset> {
        &self.dataset
    }

    /// Headlines from the last cycle. Not persisted.
    pub fn news(&self) -> Vec<NewsArticle> {
        self.news.read().clone()
    }

    /// Quote currency used for the next fetch
    pub fn currency(&self) -> String {
        self.currency.read().clone()
    }

    pub fn is_fetching(&self) -> bool {
        self.fetching.load(Ordering::Acquire)
    }

    /// Adopt the saved snapshot before the first fetch.
    ///
    /// Does nothing once the dataset holds data.
    pub fn warm_start(&self) -> bool {
        if !self.dataset.read().is_empty() {
            return false;
        }
        let Some(snapshot) = self.snapshots.load() else {
            debug!("No saved snapshot to warm start from");
            return false;
        };

        let next = Dataset::from_snapshot(snapshot);
        info!("Warm start from snapshot with {} coins", next.len());
        self.dataset.write().replace(next);
        self.evaluate_alerts();
        true
    }

    /// Run one refresh cycle unless one is already in flight
    pub async fn refresh_cycle(&self) -> CycleOutcome {
        if self.cancel.is_cancelled() {
            return CycleOutcome::Cancelled;
        }
        let Some(_guard) = FetchGuard::acquire(&self.fetching, &self.idle) else {
            debug!("Refresh requested while fetching; dropped");
            return CycleOutcome::Skipped;
        };

        let started = Instant::now();
        let currency = self.currency();
        debug!("Refresh cycle started ({})", currency);

        let (markets, trending, news) = tokio::join!(
            self.source.fetch_markets(&currency),
            self.source.fetch_trending(),
            self.source.fetch_news()
        );

        match news {
            Ok(articles) => *self.news.write() = articles,
            Err(FetchError::Cancelled) => {}
            Err(e) => {
                warn!("News fetch failed, clearing headlines: {}", e);
                self.news.write().clear();
            }
        }

        let (outcome, error) = match markets {
            Ok(coins) => {
                let trending = trending.unwrap_or_else(|e| {
                    warn!("Trending fetch failed, continuing without: {}", e);
                    Vec::new()
                });
                self.commit_fresh(Dataset::fresh(currency, coins, trending));
                (CycleOutcome::Fresh, None)
            }
            Err(FetchError::Cancelled) => {
                info!("Refresh cycle cancelled");
                (CycleOutcome::Cancelled, Some(FetchError::Cancelled.to_string()))
            }
            Err(e) => {
                warn!("Market refresh failed: {}", e);
                (self.fall_back(), Some(e.to_string()))
            }
        };

        let alerts_triggered = match outcome {
            CycleOutcome::Fresh | CycleOutcome::Fallback => self.evaluate_alerts(),
            _ => 0,
        };

        let report = CycleReport {
            outcome,
            finished_at: Utc::now(),
            duration_ms: started.elapsed().as_millis() as u64,
            error,
            alerts_triggered,
        };
        info!(
            "Refresh cycle finished: {:?} in {} ms",
            report.outcome, report.duration_ms
        );

        self.cycles_run.fetch_add(1, Ordering::Relaxed);
        *self.last_cycle.lock() = Some(report);
        outcome
    }

    /// Manual refresh.
    ///
    /// Runs a cycle immediately instead of waiting for the next tick. A
    /// request that arrives while a cycle is in flight returns
    /// [`CycleOutcome::Skipped`] and is not queued.
    pub async fn refresh_now(&self) -> CycleOutcome {
        self.refresh_cycle().await
    }

    /// Quote currency for the next cycle, without refreshing
    pub fn use_currency(&self, currency: &str) {
        *self.currency.write() = currency.to_string();
        info!("Quote currency set to {}", currency);
    }

    /// Switch the quote currency and refresh with it.
    ///
    /// Waits for an in-flight cycle to finish rather than being dropped by it.
    pub async fn set_currency(&self, currency: &str) -> CycleOutcome {
        self.use_currency(currency);

        loop {
            let idle = self.idle.notified();
            match self.refresh_cycle().await {
                CycleOutcome::Skipped => idle.await,
                outcome => return outcome,
            }
        }
    }

    fn commit_fresh(&self, next: Dataset) {
        if let Err(e) = self.snapshots.save(&next.to_snapshot()) {
            warn!("Snapshot save failed, keeping fresh data: {}", e);
        }
        self.dataset.write().replace(next);
    }

    fn fall_back(&self) -> CycleOutcome {
        match self.snapshots.load() {
            Some(snapshot) => {
                let next = Dataset::from_snapshot(snapshot);
                info!("Falling back to snapshot with {} coins", next.len());
                self.dataset.write().replace(next);
                self.notifier.notice(CACHED_DATA_NOTICE);
                CycleOutcome::Fallback
            }
            None => {
                warn!("No saved snapshot available");
                CycleOutcome::NoData
            }
        }
    }

    fn evaluate_alerts(&self) -> usize {
        let dataset = self.dataset.read();
        if dataset.is_empty() || self.alerts.is_empty() {
            return 0;
        }
        self.alerts.evaluate(&dataset).len()
    }

    /// Run a cycle every `interval`, replacing any existing timer.
    ///
    /// The first tick fires one interval from now.
    pub fn start_periodic(self: &Arc<Self>, interval: Duration) {
        let interval = interval.max(MIN_PERIOD);
        let mut periodic = self.periodic.lock();
        periodic.disarm();
        periodic.interval = Some(interval);
        periodic.paused = false;
        self.arm(&mut periodic, interval);
        info!("Periodic refresh every {:?}", interval);
    }

    /// Stop the timer without touching the dataset
    pub fn pause(&self) {
        let mut periodic = self.periodic.lock();
        if periodic.interval.is_none() || periodic.paused {
            return;
        }
        periodic.paused = true;
        periodic.disarm();
        info!("Periodic refresh paused");
    }

    /// Re-arm the timer after [`pause`](Self::pause). Does not run a cycle.
    pub fn resume(self: &Arc<Self>) {
        let mut periodic = self.periodic.lock();
        if !periodic.paused {
            return;
        }
        let Some(interval) = periodic.interval else {
            return;
        };
        periodic.paused = false;
        self.arm(&mut periodic, interval);
        info!("Periodic refresh resumed");
    }

    /// Cancel the timer and forget its interval
    pub fn stop(&self) {
        let mut periodic = self.periodic.lock();
        periodic.disarm();
        periodic.interval = None;
        periodic.paused = false;
    }

    /// Stop the timer and cancel any in-flight cycle
    pub fn shutdown(&self) {
        self.stop();
        self.cancel.cancel();
        info!("Sync scheduler shut down");
    }

    fn arm(self: &Arc<Self>, periodic: &mut PeriodicState, period: Duration) {
        let token = self.cancel.child_token();
        let timer_token = token.clone();
        let scheduler = Arc::downgrade(self);

        let handle = tokio::spawn(async move {
            let start = tokio::time::Instant::now() + period;
            let mut ticker = tokio::time::interval_at(start, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = timer_token.cancelled() => break,
                    _ = ticker.tick() => {
                        let Some(scheduler) = scheduler.upgrade() else { break };
                        scheduler.refresh_cycle().await;
                    }
                }
            }
            debug!("Periodic refresh timer stopped");
        });

        periodic.token = Some(token);
        periodic.handle = Some(handle);
    }

    pub fn status(&self) -> SchedulerStatus {
        let periodic = {
            let periodic = self.periodic.lock();
            PeriodicStatus {
                armed: periodic.is_armed(),
                paused: periodic.paused,
                interval_ms: periodic
                    .interval
                    .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX)),
            }
        };
        let dataset = self.dataset.read();

        SchedulerStatus {
            phase: if self.is_fetching() {
                Phase::Fetching
            } else {
                Phase::Idle
            },
            currency: self.currency(),
            last_update: dataset.updated_at(),
            stale: dataset.is_stale(),
            coin_count: dataset.len(),
            trending_count: dataset.trending().len(),
            periodic,
            active_alerts: self.alerts.len(),
            cycles_run: self.cycles_run.load(Ordering::Relaxed),
            last_cycle: self.last_cycle.lock().clone(),
        }
    }
}
