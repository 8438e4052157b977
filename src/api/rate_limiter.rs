//! Rate limiting middleware for the REST API
//!
//! Token bucket limits per endpoint category:
//! - General API: read endpoints and alert management
//! - Refresh: manual refreshes, which hit the market data provider

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Method, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use parking_lot::Mutex;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Rate limit type for different endpoint categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateLimitType {
    General,
    Refresh,
}

/// Token bucket rate limiter
#[derive(Debug)]
pub struct TokenBucket {
    /// Maximum tokens (requests) allowed per period
    capacity: u32,
    /// Current available tokens
    tokens: f64,
    /// Tokens added per second
    refill_rate: f64,
    last_refill: Instant,
}

impl TokenBucket {
    pub fn new(rate_per_second: u32) -> Self {
        let rate = rate_per_second.max(1);
        Self {
            capacity: rate,
            tokens: rate as f64,
            refill_rate: rate as f64,
            last_refill: Instant::now(),
        }
    }

    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill);
        self.tokens = (self.tokens + elapsed.as_secs_f64() * self.refill_rate).min(self.capacity as f64);
        self.last_refill = now;
    }

    /// Try to consume a token, returns true if allowed
    pub fn try_acquire(&mut self) -> bool {
        self.refill();

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Time until a token will be available
    pub fn time_until_available(&self) -> Duration {
        if self.tokens >= 1.0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64((1.0 - self.tokens) / self.refill_rate)
        }
    }
}

/// Shared rate limiter state
#[derive(Debug)]
pub struct RateLimiterState {
    limiters: Mutex<HashMap<RateLimitType, TokenBucket>>,
}

impl RateLimiterState {
    pub fn new(api_rate: u32, refresh_rate: u32) -> Self {
        let mut limiters = HashMap::new();
        limiters.insert(RateLimitType::General, TokenBucket::new(api_rate));
        limiters.insert(RateLimitType::Refresh, TokenBucket::new(refresh_rate));

        Self {
            limiters: Mutex::new(limiters),
        }
    }

    /// Try to acquire a token for the given rate limit type
    pub fn try_acquire(&self, rate_type: RateLimitType) -> bool {
        let mut limiters = self.limiters.lock();
        match limiters.get_mut(&rate_type) {
            Some(limiter) => limiter.try_acquire(),
            None => true,
        }
    }

    pub fn time_until_available(&self, rate_type: RateLimitType) -> Duration {
        let limiters = self.limiters.lock();
        limiters
            .get(&rate_type)
            .map(TokenBucket::time_until_available)
            .unwrap_or(Duration::ZERO)
    }
}

/// Determine rate limit type based on request path
pub fn get_rate_limit_type(path: &str) -> RateLimitType {
    if path.ends_with("/refresh") || path.ends_with("/currency") || path.ends_with("/onboarding") {
        return RateLimitType::Refresh;
    }
    RateLimitType::General
}

/// Rate limiting middleware
pub async fn rate_limit_middleware(
    State(state): State<Arc<RateLimiterState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let mut rate_type = get_rate_limit_type(&path);
    // Reading the currency never reaches the provider
    if rate_type == RateLimitType::Refresh && *request.method() == Method::GET {
        rate_type = RateLimitType::General;
    }

    if !state.try_acquire(rate_type) {
        let wait_time = state.time_until_available(rate_type);
        tracing::warn!(
            "Rate limit exceeded for {:?}, path: {}, retry after {}ms",
            rate_type,
            path,
            wait_time.as_millis()
        );
        return rate_limit_response(wait_time, rate_type);
    }

    next.run(request).await
}

fn rate_limit_response(retry_after: Duration, rate_type: RateLimitType) -> Response {
    let retry_seconds = (retry_after.as_secs_f64().ceil() as u64).max(1);
    let limit_type = format!("{:?}", rate_type).to_lowercase();

    let body = Json(json!({
        "status": "error",
        "error_type": "rate_limit_exceeded",
        "message": format!("Rate limit exceeded for {}. Please retry after {} seconds.", limit_type, retry_seconds),
        "retry_after_ms": retry_after.as_millis() as u64
    }));

    let mut response = (StatusCode::TOO_MANY_REQUESTS, body).into_response();
    let headers = response.headers_mut();
    headers.insert(header::RETRY_AFTER, HeaderValue::from(retry_seconds));
    if let Ok(value) = HeaderValue::from_str(&limit_type) {
        headers.insert("X-RateLimit-Type", value);
    }

    response
}
