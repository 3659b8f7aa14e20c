use crate::models::current_timestamp;
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, GatewayError>;

// Échecs bruts du client amont, avant classification.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("connection failed: {0}")]
    Transport(String),

    #[error("request timed out")]
    Timeout,

    #[error("unexpected status {0}")]
    Status(u16),

    #[error("invalid response body: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            UpstreamError::Timeout
        } else if let Some(status) = err.status() {
            UpstreamError::Status(status.as_u16())
        } else if err.is_decode() {
            UpstreamError::Decode(err.to_string())
        } else {
            UpstreamError::Transport(err.to_string())
        }
    }
}

// Erreurs exposées par la passerelle ; chacune correspond à une classe de statut HTTP.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("Rate limit exceeded for {category} queries. Try again in {} seconds.", retry_after_secs(.retry_after))]
    RateLimited {
        category: &'static str,
        retry_after: Duration,
    },

    #[error("Product not found: {0}")]
    NotFound(String),

    #[error("OpenFoodFacts API rate limit exceeded")]
    UpstreamRateLimited,

    #[error("Unable to connect to OpenFoodFacts API")]
    UpstreamUnavailable,

    #[error("Failed to fetch product data")]
    UpstreamError,

    #[error("Failed to search products")]
    SearchFailed,

    #[error("Route {method} {path} not found")]
    RouteNotFound { method: String, path: String },
}

// Opération amont en cours, pour que le message d'erreur corresponde à ce qui a été demandé.
#[derive(Debug, Clone, Copy)]
pub enum UpstreamCall<'a> {
    Product(&'a str),
    Search,
}

impl GatewayError {
    // Unique point de classification des échecs amont.
    pub fn from_upstream(err: UpstreamError, call: UpstreamCall<'_>) -> Self {
        match (err, call) {
            (UpstreamError::Transport(_) | UpstreamError::Timeout, _) => {
                GatewayError::UpstreamUnavailable
            }
            (UpstreamError::Status(429), _) => GatewayError::UpstreamRateLimited,
            (UpstreamError::Status(404), UpstreamCall::Product(barcode)) => {
                GatewayError::NotFound(barcode.to_string())
            }
            (_, UpstreamCall::Product(_)) => GatewayError::UpstreamError,
            (_, UpstreamCall::Search) => GatewayError::SearchFailed,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            GatewayError::RateLimited { .. } | GatewayError::UpstreamRateLimited => {
                StatusCode::TOO_MANY_REQUESTS
            }
            GatewayError::NotFound(_) | GatewayError::RouteNotFound { .. } => StatusCode::NOT_FOUND,
            GatewayError::UpstreamUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::UpstreamError | GatewayError::SearchFailed => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

// Secondes entières, arrondies au supérieur.
fn retry_after_secs(wait: &Duration) -> u64 {
    let millis = wait.as_millis() as u64;
    millis.div_ceil(1000)
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({
            "status": "error",
            "message": self.to_string(),
            "timestamp": current_timestamp(),
        }));

        let mut response = (status, body).into_response();
        if let GatewayError::RateLimited { retry_after, .. } = &self {
            if let Ok(value) = HeaderValue::from_str(&retry_after_secs(retry_after).to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}
