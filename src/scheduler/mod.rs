//! Refresh scheduling
//!
//! Drives the market data pipeline:
//! - On-demand and periodic refresh cycles
//! - Snapshot fallback when the provider is unreachable
//! - Alert evaluation after every cycle that produced data

mod sync;

pub use sync::{
    CycleOutcome, CycleReport, PeriodicStatus, Phase, SchedulerStatus, SyncScheduler,
    CACHED_DATA_NOTICE,
};
