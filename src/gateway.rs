//! Outbound HTTP fetches with a hard timeout and cooperative cancellation
//!
//! The gateway never retries. A failed fetch is reported to the caller, which
//! decides what to fall back to.

use crate::error::FetchError;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Issues single timed GET requests and classifies their outcome
pub struct RequestGateway {
    client: Client,
    cancel: CancellationToken,
}

impl RequestGateway {
    /// Gateway whose in-flight requests are cancelled when `cancel` fires
    pub fn new(cancel: CancellationToken) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(concat!("coinwatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, cancel })
    }

    /// Cancel every in-flight and future request issued through this gateway
    pub fn cancel_all(&self) {
        self.cancel.cancel();
    }

    /// Fetch `url` and decode the JSON body into `T`.
    ///
    /// The request future is dropped when the timeout elapses or the gateway is
    /// cancelled, which aborts the underlying connection.
    pub async fn fetch<T: DeserializeOwned>(&self, url: &str, timeout_ms: u64) -> Result<T, FetchError> {
        let request_token = self.cancel.child_token();
        let timeout = Duration::from_millis(timeout_ms);

        let work = async {
            let response = self
                .client
                .get(url)
                .header(reqwest::header::CACHE_CONTROL, "no-store")
                .send()
                .await
                .map_err(classify)?;

            let status = response.status();
            if !status.is_success() {
                return Err(FetchError::HttpStatus(status.as_u16()));
            }

            let body = response.bytes().await.map_err(classify)?;
            serde_json::from_slice::<T>(&body).map_err(|e| FetchError::Decode(e.to_string()))
        };

        let result = tokio::select! {
            biased;
            _ = request_token.cancelled() => Err(FetchError::Cancelled),
            outcome = tokio::time::timeout(timeout, work) => match outcome {
                Ok(result) => result,
                Err(_) => {
                    request_token.cancel();
                    Err(FetchError::Timeout(timeout_ms))
                }
            },
        };

        if let Err(e) = &result {
            debug!("GET {} failed: {}", url, e);
        }
        result
    }

    /// Fetch `url` as untyped JSON
    pub async fn fetch_json(&self, url: &str, timeout_ms: u64) -> Result<serde_json::Value, FetchError> {
        self.fetch(url, timeout_ms).await
    }
}

fn classify(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout(0)
    } else if err.is_decode() {
        FetchError::Decode(err.to_string())
    } else if let Some(status) = err.status() {
        FetchError::HttpStatus(status.as_u16())
    } else {
        FetchError::Network(err.to_string())
    }
}
