//! Captured request and relayed response.

use std::error::Error as StdError;

use axum::{
    body::{Body, Bytes},
    http::{header, HeaderMap, HeaderValue, Method, Request, StatusCode},
    response::{IntoResponse, Response},
};
use http_body_util::LengthLimitError;
use serde_json::Value;

use crate::error::{GatewayError, GatewayResult};

/// Inbound request, buffered once and replayable against any upstream.
#[derive(Debug, Clone)]
pub struct ProxiedRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ProxiedRequest {
    /// Buffer `request`, rejecting bodies above `max_body_bytes` with 413.
    pub async fn from_request(request: Request<Body>, max_body_bytes: usize) -> GatewayResult<Self> {
        let (parts, body) = request.into_parts();

        let declared = parts
            .headers
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<usize>().ok());
        if declared.is_some_and(|len| len > max_body_bytes) {
            return Err(GatewayError::PayloadTooLarge);
        }

        let body = axum::body::to_bytes(body, max_body_bytes)
            .await
            .map_err(body_read_error)?;

        Ok(Self {
            method: parts.method,
            path: parts.uri.path().to_string(),
            query: parts.uri.query().map(str::to_string),
            headers: parts.headers,
            body,
        })
    }

    pub fn path_and_query(&self) -> String {
        match &self.query {
            Some(q) if !q.is_empty() => format!("{}?{}", self.path, q),
            _ => self.path.clone(),
        }
    }

    /// Body parsed as JSON, if it is JSON.
    pub fn json_body(&self) -> Option<Value> {
        if self.body.is_empty() {
            return None;
        }
        serde_json::from_slice(&self.body).ok()
    }

    /// First value of query parameter `name`.
    pub fn query_param(&self, name: &str) -> Option<String> {
        let query = self.query.as_deref()?;
        url::form_urlencoded::parse(query.as_bytes())
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    }

    pub fn header_str(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Map a body read failure to a client error. Transport detail stays in the log.
fn body_read_error(err: axum::Error) -> GatewayError {
    if exceeded_limit(&err) {
        GatewayError::PayloadTooLarge
    } else {
        tracing::warn!(error = %err, "Failed to read request body");
        GatewayError::Validation("Failed to read request body".to_string())
    }
}

fn exceeded_limit(err: &axum::Error) -> bool {
    let mut source: Option<&(dyn StdError + 'static)> = err.source();
    while let Some(e) = source {
        if e.is::<LengthLimitError>() {
            return true;
        }
        source = e.source();
    }
    false
}

/// Response of whichever upstream answered, relayed as-is unless transformed.
#[derive(Debug, Clone)]
pub struct ProxiedResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ProxiedResponse {
    pub fn json_body(&self) -> Option<Value> {
        serde_json::from_slice(&self.body).ok()
    }

    /// Replace the body with `value`, keeping status and other headers.
    pub fn with_json_body(mut self, value: &Value) -> Self {
        self.body = Bytes::from(value.to_string());
        self.headers.remove(header::CONTENT_LENGTH);
        self.headers
            .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        self
    }
}

impl IntoResponse for ProxiedResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(body: &'static str) -> Request<Body> {
        Request::builder()
            .method(Method::GET)
            .uri("/orders?order_id=7&x=a%20b")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn captures_method_path_query_and_body() {
        let req = ProxiedRequest::from_request(request(r#"{"a":1}"#), 1024).await.unwrap();
        assert_eq!(req.method, Method::GET);
        assert_eq!(req.path, "/orders");
        assert_eq!(req.path_and_query(), "/orders?order_id=7&x=a%20b");
        assert_eq!(req.query_param("order_id").as_deref(), Some("7"));
        assert_eq!(req.query_param("x").as_deref(), Some("a b"));
        assert_eq!(req.query_param("missing"), None);
        assert_eq!(req.json_body().unwrap()["a"], 1);
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let err = ProxiedRequest::from_request(request("0123456789"), 4).await.unwrap_err();
        assert!(matches!(err, GatewayError::PayloadTooLarge));
    }

    #[test]
    fn read_failure_hides_transport_detail() {
        let err = body_read_error(axum::Error::new(std::io::Error::other(
            "connection reset by 10.0.0.5:51234",
        )));
        assert!(matches!(err, GatewayError::Validation(_)));
        assert_eq!(err.user_message(), "Failed to read request body");
        assert!(!err.body().error.contains("10.0.0.5"));
    }

    #[tokio::test]
    async fn declared_length_is_checked_up_front() {
        let req = Request::builder()
            .method(Method::POST)
            .uri("/login")
            .header(header::CONTENT_LENGTH, "4096")
            .body(Body::empty())
            .unwrap();
        let err = ProxiedRequest::from_request(req, 1024).await.unwrap_err();
        assert!(matches!(err, GatewayError::PayloadTooLarge));
    }

    #[test]
    fn rewritten_body_drops_stale_length() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from_static("99"));
        let resp = ProxiedResponse {
            status: StatusCode::OK,
            headers,
            body: Bytes::from_static(b"[]"),
        }
        .with_json_body(&serde_json::json!({"count": 0}));
        assert!(resp.headers.get(header::CONTENT_LENGTH).is_none());
        assert_eq!(resp.json_body().unwrap()["count"], 0);
    }
}
