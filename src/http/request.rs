//! Request identification and context assembly.
//!
//! # Responsibilities
//! - Read the request ID set by `SetRequestIdLayer`
//! - Turn an axum request into a `RequestContext`
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - A client-supplied `x-request-id` is kept and forwarded

use std::net::SocketAddr;

use axum::{
    body::Body,
    http::{HeaderMap, HeaderName, Request},
};

use crate::error::GatewayResult;
use crate::pipeline::RequestContext;
use crate::proxy::ProxiedRequest;
use crate::security::ClientIdentity;

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Request ID of an inbound request, or a fresh one if absent.
pub fn request_id(headers: &HeaderMap) -> String {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

/// Buffer `request` and derive its context.
pub async fn build_context(
    request: Request<Body>,
    peer: SocketAddr,
    max_body_bytes: usize,
    trust_forwarded_for: bool,
) -> GatewayResult<RequestContext> {
    let id = request_id(request.headers());
    let client = ClientIdentity::from_request(peer, request.headers(), trust_forwarded_for);
    let proxied = ProxiedRequest::from_request(request, max_body_bytes).await?;
    Ok(RequestContext::new(id, peer, client, proxied))
}
