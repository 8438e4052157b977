//! Common market data types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// One tradable asset at a point in time.
///
/// Every quantity is optional: `None` means the provider had no figure, never zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetRecord {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub symbol: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,
    #[serde(default)]
    pub current_price: Option<f64>,
    #[serde(default)]
    pub market_cap: Option<f64>,
    #[serde(default)]
    pub total_volume: Option<f64>,
    #[serde(default, rename = "market_cap_rank", deserialize_with = "positive_rank")]
    pub rank: Option<u32>,
    #[serde(default, rename = "price_change_percentage_1h_in_currency")]
    pub pct_change_1h: Option<f64>,
    #[serde(default, rename = "price_change_percentage_24h_in_currency")]
    pub pct_change_24h: Option<f64>,
    #[serde(default, rename = "price_change_percentage_7d_in_currency")]
    pub pct_change_7d: Option<f64>,
    #[serde(default, rename = "image")]
    pub image_url: Option<String>,
}

/// Trending coin entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendingRecord {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub symbol: String,
    /// Icon URL
    #[serde(default)]
    pub small: Option<String>,
    #[serde(default)]
    pub score: Option<u32>,
}

/// Wire shape of the trending endpoint: `{ coins: [{ item: {...} }] }`
#[derive(Debug, Deserialize)]
pub struct TrendingResponse {
    #[serde(default)]
    pub coins: Vec<TrendingItem>,
}

#[derive(Debug, Deserialize)]
pub struct TrendingItem {
    pub item: TrendingRecord,
}

/// Durable point-in-time copy of the dataset and trending list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub currency: String,
    pub coins: Vec<AssetRecord>,
    #[serde(default)]
    pub trending: Vec<TrendingRecord>,
}

impl Snapshot {
    pub fn new(
        currency: impl Into<String>,
        coins: Vec<AssetRecord>,
        trending: Vec<TrendingRecord>,
    ) -> Self {
        Self {
            timestamp: Some(Utc::now()),
            currency: currency.into(),
            coins,
            trending,
        }
    }
}

/// Extended single-asset view projected onto one currency
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoinDetail {
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub currency: String,
    pub rank: Option<u32>,
    pub current_price: Option<f64>,
    pub market_cap: Option<f64>,
    pub total_volume: Option<f64>,
    pub pct_change_24h: Option<f64>,
    pub pct_change_7d: Option<f64>,
    pub description: Option<String>,
    pub homepage: Option<String>,
    pub image_url: Option<String>,
}

/// Wire shape of the single-asset endpoint
#[derive(Debug, Deserialize)]
pub struct CoinDetailResponse {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub symbol: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,
    #[serde(default)]
    pub description: HashMap<String, Option<String>>,
    #[serde(default)]
    pub links: Option<CoinLinks>,
    #[serde(default)]
    pub image: Option<CoinImages>,
    #[serde(default)]
    pub market_data: Option<LocalizedMarketData>,
}

#[derive(Debug, Deserialize)]
pub struct CoinLinks {
    #[serde(default)]
    pub homepage: Vec<Option<String>>,
}

#[derive(Debug, Deserialize)]
pub struct CoinImages {
    pub small: Option<String>,
    pub large: Option<String>,
}

/// Market figures keyed by currency code
#[derive(Debug, Default, Deserialize)]
pub struct LocalizedMarketData {
    #[serde(default)]
    pub market_cap_rank: Option<u32>,
    #[serde(default)]
    pub current_price: HashMap<String, Option<f64>>,
    #[serde(default)]
    pub market_cap: HashMap<String, Option<f64>>,
    #[serde(default)]
    pub total_volume: HashMap<String, Option<f64>>,
    #[serde(default)]
    pub price_change_percentage_24h_in_currency: HashMap<String, Option<f64>>,
    #[serde(default)]
    pub price_change_percentage_7d_in_currency: HashMap<String, Option<f64>>,
}

impl CoinDetailResponse {
    /// Project the localized figures for `currency`
    pub fn into_detail(self, currency: &str) -> CoinDetail {
        let market = self.market_data.unwrap_or_default();
        let pick = |map: &HashMap<String, Option<f64>>| map.get(currency).copied().flatten();

        let description = self
            .description
            .get("en")
            .cloned()
            .flatten()
            .filter(|d| !d.trim().is_empty());
        let homepage = self
            .links
            .and_then(|l| l.homepage.into_iter().flatten().find(|h| !h.trim().is_empty()));
        let image_url = self.image.and_then(|i| i.large.or(i.small));

        CoinDetail {
            current_price: pick(&market.current_price),
            market_cap: pick(&market.market_cap),
            total_volume: pick(&market.total_volume),
            pct_change_24h: pick(&market.price_change_percentage_24h_in_currency),
            pct_change_7d: pick(&market.price_change_percentage_7d_in_currency),
            rank: market.market_cap_rank.filter(|r| *r > 0),
            id: self.id,
            symbol: self.symbol,
            name: self.name,
            currency: currency.to_string(),
            description,
            homepage,
            image_url,
        }
    }
}

/// Wire shape of the geolocation endpoint
#[derive(Debug, Deserialize)]
pub struct GeoResponse {
    #[serde(default)]
    pub country_code: Option<String>,
}

/// Crypto news headline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsArticle {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub url: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default, rename = "imageurl")]
    pub image_url: Option<String>,
    #[serde(default, rename = "published_on", with = "chrono::serde::ts_seconds_option")]
    pub published_at: Option<DateTime<Utc>>,
}

/// Wire shape of the news endpoint: `{ Data: [...] }`
#[derive(Debug, Deserialize)]
pub struct NewsResponse {
    #[serde(default, rename = "Data")]
    pub data: Vec<NewsArticle>,
}

/// Suggested default currency derived from geolocation
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RegionSuggestion {
    pub country: Option<String>,
    pub currency: Option<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn positive_rank<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<u32>::deserialize(deserializer)?.filter(|r| *r > 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_news_response_payload() {
        let payload = json!({
            "Type": 100,
            "Data": [
                {
                    "id": "4711",
                    "published_on": 1_700_000_000,
                    "imageurl": "https://example.invalid/n.png",
                    "title": "Bitcoin climbs",
                    "url": "https://example.invalid/story",
                    "body": "Markets moved.",
                    "source": "wire",
                    "tags": "BTC"
                },
                {"id": "4712", "title": null}
            ]
        });

        let response: NewsResponse = serde_json::from_value(payload).unwrap();
        assert_eq!(response.data.len(), 2);
        let first = &response.data[0];
        assert_eq!(first.title, "Bitcoin climbs");
        assert_eq!(first.published_at.unwrap().timestamp(), 1_700_000_000);
        assert_eq!(first.image_url.as_deref(), Some("https://example.invalid/n.png"));
        assert_eq!(response.data[1].title, "");
        assert_eq!(response.data[1].published_at, None);
    }

    #[test]
    fn test_asset_record_from_markets_payload() {
        let payload = json!({
            "id": "bitcoin",
            "symbol": "btc",
            "name": "Bitcoin",
            "image": "https://example.invalid/btc.png",
            "current_price": 60000.5,
            "market_cap": 1.2e12,
            "market_cap_rank": 1,
            "total_volume": 3.4e10,
            "price_change_percentage_1h_in_currency": 0.1,
            "price_change_percentage_24h_in_currency": -2.5,
            "price_change_percentage_7d_in_currency": null,
            "ath": 73000.0
        });

        let record: AssetRecord = serde_json::from_value(payload).unwrap();
        assert_eq!(record.id, "bitcoin");
        assert_eq!(record.rank, Some(1));
        assert_eq!(record.pct_change_24h, Some(-2.5));
        assert_eq!(record.pct_change_7d, None);
        assert_eq!(record.image_url.as_deref(), Some("https://example.invalid/btc.png"));
    }

    #[test]
    fn test_missing_quantities_are_none_not_zero() {
        let record: AssetRecord =
            serde_json::from_value(json!({"id": "x", "symbol": null, "name": "X", "market_cap_rank": 0}))
                .unwrap();
        assert_eq!(record.symbol, "");
        assert_eq!(record.current_price, None);
        assert_eq!(record.rank, None);
    }

    #[test]
    fn test_snapshot_requires_coin_list() {
        let without_coins = serde_json::from_str::<Snapshot>(r#"{"timestamp": 1, "currency": "usd"}"#);
        assert!(without_coins.is_err());

        let minimal: Snapshot = serde_json::from_str(r#"{"coins": []}"#).unwrap();
        assert!(minimal.timestamp.is_none());
        assert!(minimal.trending.is_empty());
    }

    #[test]
    fn test_coin_detail_projection() {
        let payload = json!({
            "id": "ethereum",
            "symbol": "eth",
            "name": "Ethereum",
            "description": {"en": "Smart contracts"},
            "links": {"homepage": ["", "https://ethereum.org"]},
            "image": {"small": "s.png", "large": "l.png"},
            "market_data": {
                "market_cap_rank": 2,
                "current_price": {"usd": 3000.0, "eur": 2800.0},
                "market_cap": {"eur": 3.3e11},
                "total_volume": {},
                "price_change_percentage_24h_in_currency": {"eur": 1.5},
                "price_change_percentage_7d_in_currency": {"eur": null}
            }
        });

        let response: CoinDetailResponse = serde_json::from_value(payload).unwrap();
        let detail = response.into_detail("eur");
        assert_eq!(detail.current_price, Some(2800.0));
        assert_eq!(detail.market_cap, Some(3.3e11));
        assert_eq!(detail.total_volume, None);
        assert_eq!(detail.pct_change_7d, None);
        assert_eq!(detail.homepage.as_deref(), Some("https://ethereum.org"));
        assert_eq!(detail.image_url.as_deref(), Some("l.png"));
    }
}
