//! Local REST API
//!
//! Read-only market views, alert management and refresh control for
//! external consumers such as renderers.

mod handlers;
mod rate_limiter;
mod server;
mod types;

pub use server::{router, ApiServer};
pub use types::{ApiError, ApiResponse, ApiResult, Empty};
