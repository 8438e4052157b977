//! Runtime configuration derived from environment variables

use std::env;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_NEWS_URL: &str = "https://min-api.cryptocompare.com/data/v2/news/";

/// Process-level configuration.
///
/// User preferences (currency, onboarding) live in the settings store, not here.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,

    // ── Local API ──────────────────────────────────────────────────
    pub api_enabled: bool,
    pub api_host: String,
    pub api_port: u16,
    pub refresh_rate_per_sec: u32,

    // ── Sync ───────────────────────────────────────────────────────
    pub refresh_interval_ms: u64,
    pub markets_page_size: u32,

    // ── Timeouts per endpoint ──────────────────────────────────────
    pub markets_timeout_ms: u64,
    pub trending_timeout_ms: u64,
    pub detail_timeout_ms: u64,
    pub region_timeout_ms: u64,
    pub news_timeout_ms: u64,

    // ── News ───────────────────────────────────────────────────────
    pub news_limit: usize,

    // ── Upstreams ──────────────────────────────────────────────────
    pub coingecko_url: String,
    pub geo_url: String,
    pub news_url: String,
}

fn env_str(name: &str, default: &str) -> String {
    env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_u16(name: &str, default: u16) -> u16 {
    env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn env_u32(name: &str, default: u32) -> u32 {
    env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn env_bool(name: &str, default: bool) -> bool {
    env::var(name)
        .ok()
        .map(|s| matches!(s.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "y" | "on"))
        .unwrap_or(default)
}

fn env_path(name: &str, default: PathBuf) -> PathBuf {
    env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .unwrap_or(default)
}

/// Whole seconds to milliseconds, at least one second
fn secs_to_ms(secs: u64) -> u64 {
    secs.max(1).saturating_mul(1000)
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("coinwatch")
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            data_dir: env_path("COINWATCH_DATA_DIR", default_data_dir()),
            api_enabled: env_bool("COINWATCH_API_ENABLED", true),
            api_host: env_str("COINWATCH_API_HOST", "127.0.0.1"),
            api_port: env_u16("COINWATCH_API_PORT", 5871),
            refresh_rate_per_sec: env_u32("COINWATCH_REFRESH_RATE_PER_SEC", 2).max(1),
            refresh_interval_ms: secs_to_ms(env_u64("COINWATCH_REFRESH_INTERVAL_SECS", 300)),
            markets_page_size: env_u32("COINWATCH_MARKETS_PAGE_SIZE", 250).clamp(1, 250),
            markets_timeout_ms: env_u64("COINWATCH_MARKETS_TIMEOUT_MS", 8000),
            trending_timeout_ms: env_u64("COINWATCH_TRENDING_TIMEOUT_MS", 6000),
            detail_timeout_ms: env_u64("COINWATCH_DETAIL_TIMEOUT_MS", 8000),
            region_timeout_ms: env_u64("COINWATCH_REGION_TIMEOUT_MS", 2500),
            news_timeout_ms: env_u64("COINWATCH_NEWS_TIMEOUT_MS", 6000),
            news_limit: env_u32("COINWATCH_NEWS_LIMIT", 4) as usize,
            coingecko_url: env_str("COINWATCH_COINGECKO_URL", "https://api.coingecko.com/api/v3"),
            geo_url: env_str("COINWATCH_GEO_URL", "https://ipwho.is"),
            news_url: env_str("COINWATCH_NEWS_URL", DEFAULT_NEWS_URL),
        }
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("coinwatch.db")
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            api_enabled: true,
            api_host: "127.0.0.1".to_string(),
            api_port: 5871,
            refresh_rate_per_sec: 2,
            refresh_interval_ms: 5 * 60 * 1000,
            markets_page_size: 250,
            markets_timeout_ms: 8000,
            trending_timeout_ms: 6000,
            detail_timeout_ms: 8000,
            region_timeout_ms: 2500,
            news_timeout_ms: 6000,
            news_limit: 4,
            coingecko_url: "https://api.coingecko.com/api/v3".to_string(),
            geo_url: "https://ipwho.is".to_string(),
            news_url: DEFAULT_NEWS_URL.to_string(),
        }
    }
}
