//! Gateway error taxonomy.
//!
//! Every failure a client can observe is one of these variants, rendered as
//! `{"error": <message>, "code": <stable key>}` with a fixed status code.
//! Internal detail is logged, never sent to the client.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::StoreError;

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Message returned when every upstream instance failed.
pub const ALL_INSTANCES_UNAVAILABLE: &str = "All instances are unavailable. Please try again later.";

#[derive(Debug, Error)]
pub enum GatewayError {
    /// Malformed client payload.
    #[error("{0}")]
    Validation(String),

    /// Missing, invalid or expired credentials.
    #[error("{0}")]
    Unauthenticated(String),

    /// Authenticated but not allowed.
    #[error("{0}")]
    Unauthorized(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Every upstream instance was unreachable.
    #[error("{0}")]
    UpstreamUnavailable(String),

    #[error("Counter store unavailable")]
    StoreUnavailable(#[source] StoreError),

    #[error("Request body too large")]
    PayloadTooLarge,

    #[error("Not found")]
    NotFound,

    #[error("Method not allowed")]
    MethodNotAllowed,
}

/// Wire shape of every error response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: String,
    pub code: String,
}

impl GatewayError {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::Validation(_) => StatusCode::BAD_REQUEST,
            GatewayError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            GatewayError::Unauthorized(_) => StatusCode::FORBIDDEN,
            GatewayError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            GatewayError::UpstreamUnavailable(_) | GatewayError::StoreUnavailable(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            GatewayError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            GatewayError::NotFound => StatusCode::NOT_FOUND,
            GatewayError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
        }
    }

    /// Stable key for programmatic error handling.
    pub fn error_code(&self) -> &'static str {
        match self {
            GatewayError::Validation(_) => "validation_error",
            GatewayError::Unauthenticated(_) => "unauthenticated",
            GatewayError::Unauthorized(_) => "unauthorized",
            GatewayError::RateLimitExceeded => "rate_limit_exceeded",
            GatewayError::UpstreamUnavailable(_) => "upstream_unavailable",
            GatewayError::StoreUnavailable(_) => "store_unavailable",
            GatewayError::PayloadTooLarge => "payload_too_large",
            GatewayError::NotFound => "not_found",
            GatewayError::MethodNotAllowed => "method_not_allowed",
        }
    }

    /// Client-facing message, without internal detail.
    pub fn user_message(&self) -> String {
        match self {
            GatewayError::StoreUnavailable(_) => "Service Unavailable".to_string(),
            other => other.to_string(),
        }
    }

    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            error: self.user_message(),
            code: self.error_code().to_string(),
        }
    }
}

impl From<StoreError> for GatewayError {
    fn from(err: StoreError) -> Self {
        GatewayError::StoreUnavailable(err)
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        if let GatewayError::StoreUnavailable(source) = &self {
            tracing::warn!(error = %source, "Counter store unavailable");
        }
        (self.status_code(), Json(self.body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_status_codes() {
        assert_eq!(GatewayError::Validation("x".into()).status_code(), 400);
        assert_eq!(GatewayError::Unauthenticated("x".into()).status_code(), 401);
        assert_eq!(GatewayError::Unauthorized("x".into()).status_code(), 403);
        assert_eq!(GatewayError::RateLimitExceeded.status_code(), 429);
        assert_eq!(GatewayError::UpstreamUnavailable("x".into()).status_code(), 503);
        assert_eq!(
            GatewayError::StoreUnavailable(StoreError::Unavailable("down".into())).status_code(),
            503
        );
    }

    #[test]
    fn store_detail_is_not_rendered() {
        let body = GatewayError::StoreUnavailable(StoreError::Unavailable("10.0.0.7:6379 refused".into())).body();
        assert_eq!(body.error, "Service Unavailable");
        assert_eq!(body.code, "store_unavailable");
        assert!(!body.error.contains("10.0.0.7"));
    }

    #[tokio::test]
    async fn renders_uniform_json() {
        let response = GatewayError::RateLimitExceeded.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        let bytes = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        let body: ErrorBody = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.error, "Rate limit exceeded");
        assert_eq!(body.code, "rate_limit_exceeded");
    }
}
