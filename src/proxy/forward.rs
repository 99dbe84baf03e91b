//! Single-attempt forwarding to one upstream instance.

use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{HeaderValue, Request, Uri},
};
use http_body_util::BodyExt;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use thiserror::Error;
use url::Url;

use crate::http::request::X_REQUEST_ID;
use crate::proxy::request::{ProxiedRequest, ProxiedResponse};
use crate::security::headers::{append_forwarded_for, strip_hop_by_hop};

/// Transport-level failure. Only these trigger failover to another instance.
#[derive(Debug, Clone, Error)]
pub enum ConnectionError {
    #[error("invalid upstream target {0}")]
    InvalidTarget(String),
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("upstream did not answer within {0:?}")]
    Timeout(Duration),
    #[error("failed to read upstream body: {0}")]
    Body(String),
}

/// Per-request metadata added to the outbound call.
#[derive(Debug, Clone, Default)]
pub struct ForwardContext {
    pub request_id: Option<String>,
    pub client_ip: Option<IpAddr>,
}

#[async_trait]
pub trait Forward: Send + Sync + std::fmt::Debug {
    /// Send `request` to `base` and buffer the full answer.
    async fn forward(
        &self,
        request: &ProxiedRequest,
        base: &Url,
        ctx: &ForwardContext,
    ) -> Result<ProxiedResponse, ConnectionError>;
}

/// Forwarder over a pooled hyper client.
#[derive(Debug, Clone)]
pub struct HttpForwarder {
    client: Client<HttpConnector, Body>,
    timeout: Duration,
}

impl HttpForwarder {
    pub fn new(timeout: Duration) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(timeout));
        let client = Client::builder(TokioExecutor::new()).build(connector);
        Self { client, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Join an instance base URL with the inbound path and query.
pub fn target_uri(base: &Url, path_and_query: &str) -> Result<Uri, ConnectionError> {
    let joined = format!("{}{}", base.as_str().trim_end_matches('/'), path_and_query);
    joined
        .parse::<Uri>()
        .map_err(|_| ConnectionError::InvalidTarget(joined))
}

#[async_trait]
impl Forward for HttpForwarder {
    async fn forward(
        &self,
        request: &ProxiedRequest,
        base: &Url,
        ctx: &ForwardContext,
    ) -> Result<ProxiedResponse, ConnectionError> {
        let uri = target_uri(base, &request.path_and_query())?;

        let mut headers = strip_hop_by_hop(&request.headers);
        if let Some(ip) = ctx.client_ip {
            append_forwarded_for(&mut headers, ip);
        }
        if let Some(id) = ctx.request_id.as_deref().and_then(|id| HeaderValue::from_str(id).ok()) {
            headers.insert(X_REQUEST_ID, id);
        }

        let mut outbound = Request::builder()
            .method(request.method.clone())
            .uri(uri.clone())
            .body(Body::from(request.body.clone()))
            .map_err(|e| ConnectionError::InvalidTarget(e.to_string()))?;
        *outbound.headers_mut() = headers;

        let attempt = async {
            let response = self
                .client
                .request(outbound)
                .await
                .map_err(|e| ConnectionError::Connect(e.to_string()))?;
            let (parts, body) = response.into_parts();
            let body = body
                .collect()
                .await
                .map_err(|e| ConnectionError::Body(e.to_string()))?
                .to_bytes();
            Ok::<_, ConnectionError>(ProxiedResponse {
                status: parts.status,
                headers: strip_hop_by_hop(&parts.headers),
                body,
            })
        };

        match tokio::time::timeout(self.timeout, attempt).await {
            Ok(result) => result,
            Err(_) => {
                tracing::debug!(target_uri = %uri, timeout = ?self.timeout, "Upstream call timed out");
                Err(ConnectionError::Timeout(self.timeout))
            }
        }
    }
}
