//! Market data sources and the in-memory dataset

pub mod coingecko;
pub mod currency;
pub mod dataset;
pub mod types;

use crate::error::FetchError;
use async_trait::async_trait;
use types::*;

pub use coingecko::CoinGeckoSource;
pub use dataset::{Dataset, RankMetric, SortDirection, SortKey, SortSpec};

/// Upstream provider of market data.
///
/// Implementations perform exactly one attempt per call; retry policy belongs
/// to the scheduler.
#[async_trait]
pub trait MarketSource: Send + Sync {
    /// Markets listing for `currency`, ordered by market cap
    async fn fetch_markets(&self, currency: &str) -> Result<Vec<AssetRecord>, FetchError>;

    /// Currently trending coins
    async fn fetch_trending(&self) -> Result<Vec<TrendingRecord>, FetchError>;

    /// Extended detail for one asset, projected onto `currency`
    async fn fetch_coin_detail(&self, id: &str, currency: &str) -> Result<CoinDetail, FetchError>;

    /// ISO country code of the caller
    async fn detect_country(&self) -> Result<String, FetchError>;

    /// Latest crypto headlines. Sources without a news feed have none.
    async fn fetch_news(&self) -> Result<Vec<NewsArticle>, FetchError> {
        Ok(Vec::new())
    }
}
