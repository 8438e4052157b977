//! CoinGecko market data adapter

use crate::config::AppConfig;
use crate::error::FetchError;
use crate::gateway::RequestGateway;
use crate::market::types::*;
use crate::market::MarketSource;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;
use url::Url;

/// CoinGecko implementation of [`MarketSource`]. Headlines come from the
/// CryptoCompare news feed.
pub struct CoinGeckoSource {
    gateway: Arc<RequestGateway>,
    base_url: String,
    geo_url: String,
    news_url: String,
    page_size: u32,
    news_limit: usize,
    markets_timeout_ms: u64,
    trending_timeout_ms: u64,
    detail_timeout_ms: u64,
    region_timeout_ms: u64,
    news_timeout_ms: u64,
}

impl CoinGeckoSource {
    pub fn new(gateway: Arc<RequestGateway>, config: &AppConfig) -> Self {
        Self {
            gateway,
            base_url: config.coingecko_url.trim_end_matches('/').to_string(),
            geo_url: config.geo_url.trim_end_matches('/').to_string(),
            news_url: config.news_url.clone(),
            page_size: config.markets_page_size,
            news_limit: config.news_limit,
            markets_timeout_ms: config.markets_timeout_ms,
            trending_timeout_ms: config.trending_timeout_ms,
            detail_timeout_ms: config.detail_timeout_ms,
            region_timeout_ms: config.region_timeout_ms,
            news_timeout_ms: config.news_timeout_ms,
        }
    }

    fn endpoint(&self, path: &str, params: &[(&str, &str)]) -> Result<Url, FetchError> {
        let raw = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let parsed = if params.is_empty() {
            Url::parse(&raw)
        } else {
            Url::parse_with_params(&raw, params)
        };
        parsed.map_err(|e| FetchError::Network(format!("Invalid URL {}: {}", raw, e)))
    }

    /// Markets listing URL for `currency`
    pub fn markets_url(&self, currency: &str) -> Result<Url, FetchError> {
        let per_page = self.page_size.to_string();
        self.endpoint(
            "coins/markets",
            &[
                ("vs_currency", currency),
                ("order", "market_cap_desc"),
                ("per_page", per_page.as_str()),
                ("page", "1"),
                ("sparkline", "false"),
                ("price_change_percentage", "1h,24h,7d"),
            ],
        )
    }

    /// English-language news feed URL
    pub fn news_url(&self) -> Result<Url, FetchError> {
        Url::parse_with_params(&self.news_url, &[("lang", "EN")])
            .map_err(|e| FetchError::Network(format!("Invalid URL {}: {}", self.news_url, e)))
    }

    /// Single-asset detail URL
    pub fn detail_url(&self, id: &str) -> Result<Url, FetchError> {
        let mut url = self.endpoint(
            "coins",
            &[
                ("localization", "false"),
                ("tickers", "false"),
                ("market_data", "true"),
                ("community_data", "false"),
                ("developer_data", "false"),
                ("sparkline", "false"),
            ],
        )?;
        url.path_segments_mut()
            .map_err(|_| FetchError::Network(format!("Cannot append path to {}", self.base_url)))?
            .push(id);
        Ok(url)
    }
}

#[async_trait]
impl MarketSource for CoinGeckoSource {
    async fn fetch_markets(&self, currency: &str) -> Result<Vec<AssetRecord>, FetchError> {
        let url = self.markets_url(currency)?;
        let coins: Vec<AssetRecord> = self.gateway.fetch(url.as_str(), self.markets_timeout_ms).await?;
        info!("Fetched {} markets quoted in {}", coins.len(), currency);
        Ok(coins)
    }

    async fn fetch_trending(&self) -> Result<Vec<TrendingRecord>, FetchError> {
        let url = self.endpoint("search/trending", &[])?;
        let response: TrendingResponse = self.gateway.fetch(url.as_str(), self.trending_timeout_ms).await?;
        Ok(response.coins.into_iter().map(|c| c.item).collect())
    }

    async fn fetch_coin_detail(&self, id: &str, currency: &str) -> Result<CoinDetail, FetchError> {
        let url = self.detail_url(id)?;
        let response: CoinDetailResponse = self.gateway.fetch(url.as_str(), self.detail_timeout_ms).await?;
        Ok(response.into_detail(currency))
    }

    async fn detect_country(&self) -> Result<String, FetchError> {
        let raw = format!("{}/", self.geo_url);
        let url = Url::parse_with_params(&raw, &[("fields", "country_code")])
            .map_err(|e| FetchError::Network(format!("Invalid URL {}: {}", raw, e)))?;

        let response: GeoResponse = self.gateway.fetch(url.as_str(), self.region_timeout_ms).await?;
        response
            .country_code
            .map(|c| c.trim().to_uppercase())
            .filter(|c| !c.is_empty())
            .ok_or_else(|| FetchError::Decode("missing country_code".to_string()))
    }

    async fn fetch_news(&self) -> Result<Vec<NewsArticle>, FetchError> {
        let url = self.news_url()?;
        let response: NewsResponse = self.gateway.fetch(url.as_str(), self.news_timeout_ms).await?;
        let mut articles = response.data;
        articles.truncate(self.news_limit);
        Ok(articles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_util::sync::CancellationToken;

    fn source() -> CoinGeckoSource {
        let gateway = Arc::new(RequestGateway::new(CancellationToken::new()).unwrap());
        let config = AppConfig {
            coingecko_url: "https://api.example.invalid/api/v3/".to_string(),
            ..AppConfig::default()
        };
        CoinGeckoSource::new(gateway, &config)
    }

    #[test]
    fn test_markets_url() {
        let url = source().markets_url("eur").unwrap();
        assert_eq!(url.path(), "/api/v3/coins/markets");

        let query: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(query.contains(&("vs_currency".to_string(), "eur".to_string())));
        assert!(query.contains(&("per_page".to_string(), "250".to_string())));
        assert!(query.contains(&("price_change_percentage".to_string(), "1h,24h,7d".to_string())));
    }

    #[test]
    fn test_news_url() {
        let url = source().news_url().unwrap();
        assert_eq!(url.host_str(), Some("min-api.cryptocompare.com"));
        assert_eq!(url.path(), "/data/v2/news/");
        assert_eq!(url.query(), Some("lang=EN"));
    }

    #[test]
    fn test_detail_url_escapes_id() {
        let url = source().detail_url("wrapped bitcoin").unwrap();
        assert_eq!(url.path(), "/api/v3/coins/wrapped%20bitcoin");
        assert!(url.query().unwrap_or_default().contains("market_data=true"));
    }
}
