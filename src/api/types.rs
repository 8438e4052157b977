//! REST API request and response types

use crate::alerts::AlertRecord;
use crate::error::{AppError, ErrorResponse};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Deserializer, Serialize};

/// Accept a price sent either as a JSON number or as a numeric string
fn deserialize_flexible_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum FlexibleFloat {
        Float(f64),
        Int(i64),
        Str(String),
    }

    match FlexibleFloat::deserialize(deserializer)? {
        FlexibleFloat::Float(f) => Ok(f),
        FlexibleFloat::Int(i) => Ok(i as f64),
        FlexibleFloat::Str(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

// ============================================================================
// Envelope
// ============================================================================

/// Response envelope shared by every endpoint
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success_with_message(message: &str) -> Self {
        Self {
            status: "success".to_string(),
            message: Some(message.to_string()),
            error_type: None,
            data: None,
        }
    }

    pub fn success_with_data(data: T) -> Self {
        Self {
            status: "success".to_string(),
            message: None,
            error_type: None,
            data: Some(data),
        }
    }

    pub fn error(error_type: &str, message: &str) -> Self {
        Self {
            status: "error".to_string(),
            message: Some(message.to_string()),
            error_type: Some(error_type.to_string()),
            data: None,
        }
    }
}

/// Placeholder payload for responses without data
#[derive(Debug, Clone, Serialize)]
pub struct Empty {}

/// Application error rendered as an error envelope
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl<E: Into<AppError>> From<E> for ApiError {
    fn from(err: E) -> Self {
        ApiError(err.into())
    }
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match &self.0 {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Fetch(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("API error: {}", self.0);
        }
        let err = ErrorResponse::from(self.0);
        let body = ApiResponse::<Empty>::error(&err.code, &err.message);
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

// ============================================================================
// Requests
// ============================================================================

/// Query for GET /api/v1/coins
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ViewQuery {
    #[serde(default)]
    pub sort: String,
    #[serde(default)]
    pub dir: String,
    #[serde(default)]
    pub q: String,
}

fn default_top_n() -> usize {
    10
}

/// Query for GET /api/v1/top
#[derive(Debug, Clone, Deserialize)]
pub struct TopQuery {
    pub metric: String,
    #[serde(default)]
    pub dir: String,
    #[serde(default = "default_top_n")]
    pub n: usize,
}

/// Body for POST /api/v1/alerts
#[derive(Debug, Clone, Deserialize)]
pub struct CreateAlertRequest {
    pub symbol: String,
    #[serde(deserialize_with = "deserialize_flexible_f64")]
    pub price: f64,
    #[serde(default)]
    pub name: Option<String>,
}

/// Body for PUT /api/v1/currency
#[derive(Debug, Clone, Deserialize)]
pub struct CurrencyRequest {
    pub currency: String,
}

/// Body for POST /api/v1/onboarding
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OnboardingRequest {
    #[serde(default)]
    pub currency: Option<String>,
}

// ============================================================================
// Responses
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct CurrencyData {
    pub currency: String,
    pub symbol: String,
    pub supported: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AlertList {
    pub count: usize,
    pub alerts: Vec<AlertRecord>,
}
