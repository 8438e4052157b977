//! REST API over a live listener

use async_trait::async_trait;
use coinwatch_lib::api::router;
use coinwatch_lib::config::AppConfig;
use coinwatch_lib::db::sqlite::SqliteDb;
use coinwatch_lib::error::FetchError;
use coinwatch_lib::market::types::{AssetRecord, CoinDetail, TrendingRecord};
use coinwatch_lib::market::MarketSource;
use coinwatch_lib::state::AppState;
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::sync::Arc;

struct StaticSource;

#[async_trait]
impl MarketSource for StaticSource {
    async fn fetch_markets(&self, _currency: &str) -> Result<Vec<AssetRecord>, FetchError> {
        Ok(vec![AssetRecord {
            id: "bitcoin".to_string(),
            symbol: "btc".to_string(),
            name: "Bitcoin".to_string(),
            current_price: Some(60000.0),
            market_cap: Some(1.2e12),
            total_volume: Some(3.0e10),
            rank: Some(1),
            pct_change_1h: None,
            pct_change_24h: Some(1.0),
            pct_change_7d: None,
            image_url: None,
        }])
    }

    async fn fetch_trending(&self) -> Result<Vec<TrendingRecord>, FetchError> {
        Ok(Vec::new())
    }

    async fn fetch_coin_detail(&self, _id: &str, _currency: &str) -> Result<CoinDetail, FetchError> {
        Err(FetchError::HttpStatus(404))
    }

    async fn detect_country(&self) -> Result<String, FetchError> {
        Err(FetchError::Timeout(2500))
    }
}

async fn spawn_api() -> (String, Arc<AppState>) {
    let config = AppConfig {
        refresh_rate_per_sec: 1,
        ..AppConfig::default()
    };
    let sqlite = Arc::new(SqliteDb::open_in_memory().unwrap());
    let state = Arc::new(AppState::with_source(config, sqlite, Arc::new(StaticSource)).unwrap());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = router(state.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), state)
}

#[tokio::test]
async fn test_health_and_coins() {
    let (base, state) = spawn_api().await;
    let client = reqwest::Client::new();

    let body: Value = client.get(format!("{}/health", base)).send().await.unwrap().json().await.unwrap();
    assert_eq!(body["status"], "success");

    state.scheduler.refresh_now().await;
    let resp = client
        .get(format!("{}/api/v1/coins?sort=price&dir=desc&q=BIT", base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["coins"][0]["id"], "bitcoin");
    assert_eq!(body["data"]["sort"]["key"], "price");

    let body: Value = client.get(format!("{}/api/v1/status", base)).send().await.unwrap().json().await.unwrap();
    assert_eq!(body["data"]["phase"], "Idle");
    assert_eq!(body["data"]["coinCount"], 1);
    assert_eq!(body["data"]["trendingCount"], 0);
    assert_eq!(body["data"]["activeAlerts"], 0);
    assert_eq!(body["data"]["periodic"]["armed"], false);

    let body: Value = client.get(format!("{}/api/v1/news", base)).send().await.unwrap().json().await.unwrap();
    assert_eq!(body["data"], json!([]));

    let resp = client
        .get(format!("{}/api/v1/coins?sort=colour", base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "error");
    assert_eq!(body["error_type"], "VALIDATION_ERROR");

    let resp = client
        .get(format!("{}/api/v1/coins?sort=price&dir=sideways", base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Unknown sort direction: sideways");

    let resp = client
        .get(format!("{}/api/v1/top?metric=shoe_size", base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_alert_lifecycle() {
    let (base, _state) = spawn_api().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/api/v1/alerts", base))
        .json(&json!({"symbol": "BTC", "price": "70000", "name": "Bitcoin"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = resp.json().await.unwrap();
    let id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["coinSymbol"], "btc");

    let resp = client
        .post(format!("{}/api/v1/alerts", base))
        .json(&json!({"symbol": "BTC", "price": 0}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = client.get(format!("{}/api/v1/alerts", base)).send().await.unwrap().json().await.unwrap();
    assert_eq!(body["data"]["count"], 1);

    for _ in 0..2 {
        let resp = client
            .delete(format!("{}/api/v1/alerts/{}", base, id))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let body: Value = client.get(format!("{}/api/v1/notifications", base)).send().await.unwrap().json().await.unwrap();
    assert_eq!(body["data"][0]["message"], "Alert set for Bitcoin at $70,000");
}

#[tokio::test]
async fn test_refresh_is_rate_limited() {
    let (base, _state) = spawn_api().await;
    let client = reqwest::Client::new();

    let resp = client.post(format!("{}/api/v1/refresh", base)).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["started"], true);
    assert_eq!(body["data"]["outcome"], "fresh");

    let resp = client.post(format!("{}/api/v1/refresh", base)).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(resp.headers().contains_key("retry-after"));
}

#[tokio::test]
async fn test_detail_currency_and_region() {
    let (base, _state) = spawn_api().await;
    let client = reqwest::Client::new();

    let resp = client.get(format!("{}/api/v1/coins/nope", base)).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = client
        .put(format!("{}/api/v1/currency", base))
        .json(&json!({"currency": "doubloons"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = client.get(format!("{}/api/v1/currency", base)).send().await.unwrap().json().await.unwrap();
    assert_eq!(body["data"]["currency"], "usd");
    assert_eq!(body["data"]["symbol"], "$");

    let body: Value = client.get(format!("{}/api/v1/region", base)).send().await.unwrap().json().await.unwrap();
    assert_eq!(body["data"]["country"], Value::Null);
    assert_eq!(body["data"]["currency"], Value::Null);
}
