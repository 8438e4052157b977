//! Services Layer
//!
//! Operations shared by the runtime and the REST API handlers.
//!
//! ```text
//! Runtime (run) ──────┐
//!                     ├──> Services --> Scheduler / AlertEngine / DB
//! REST API ───────────┘
//! ```
//!
//! # Services
//!
//! - `MarketService` - Views, rankings, refresh, currency and region
//! - `AlertService` - Create, list, remove price alerts

pub mod alert_service;
pub mod market_service;

pub use alert_service::AlertService;
pub use market_service::{MarketService, MarketView, RefreshResult};
