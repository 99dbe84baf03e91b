//! Pipeline handlers.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

use crate::error::{GatewayError, GatewayResult};
use crate::load_balancer::UpstreamPool;
use crate::observability::metrics;
use crate::pipeline::{Handler, RequestContext};
use crate::proxy::{apply_transforms, Forward, ProxiedResponse, ResponseTransform};
use crate::security::{bearer_token, Authenticator, RateLimiter, TokenStatus};

/// Forward to a pool, then apply the route's response transforms.
#[derive(Debug, Clone)]
pub struct ProxyHandler {
    pool: Arc<UpstreamPool>,
    forwarder: Arc<dyn Forward>,
    transforms: Vec<Arc<dyn ResponseTransform>>,
}

impl ProxyHandler {
    pub fn new(pool: Arc<UpstreamPool>, forwarder: Arc<dyn Forward>) -> Self {
        Self {
            pool,
            forwarder,
            transforms: Vec::new(),
        }
    }

    pub fn transform(mut self, transform: impl ResponseTransform + 'static) -> Self {
        self.transforms.push(Arc::new(transform));
        self
    }

    pub async fn proxy(&self, ctx: &RequestContext) -> GatewayResult<ProxiedResponse> {
        let response = self
            .pool
            .select_and_forward(&ctx.request, self.forwarder.as_ref(), &ctx.forward_context())
            .await?;
        Ok(apply_transforms(&self.transforms, &ctx.request, response))
    }
}

#[async_trait]
impl Handler for ProxyHandler {
    async fn handle(&self, ctx: RequestContext) -> Response {
        match self.proxy(&ctx).await {
            Ok(response) => response.into_response(),
            Err(e) => e.into_response(),
        }
    }
}

/// Proxy a login and register the issued token as a session.
///
/// Registration is a no-op under the JWT strategy.
#[derive(Debug, Clone)]
pub struct LoginHandler {
    proxy: ProxyHandler,
    authenticator: Arc<dyn Authenticator>,
}

impl LoginHandler {
    pub fn new(proxy: ProxyHandler, authenticator: Arc<dyn Authenticator>) -> Self {
        Self { proxy, authenticator }
    }
}

fn issued_token(body: &Value) -> Option<&str> {
    body.get("token")
        .or_else(|| body.get("access_token"))
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
}

#[async_trait]
impl Handler for LoginHandler {
    async fn handle(&self, ctx: RequestContext) -> Response {
        let response = match self.proxy.proxy(&ctx).await {
            Ok(response) => response,
            Err(e) => return e.into_response(),
        };
        if !response.status.is_success() {
            return response.into_response();
        }

        let issued = response.json_body();
        if let Some(token) = issued.as_ref().and_then(issued_token) {
            let subject = ctx
                .request
                .json_body()
                .and_then(|b| b.get("username").and_then(Value::as_str).map(str::to_string))
                .unwrap_or_default();
            if let Err(e) = self.authenticator.register(token, &subject).await {
                metrics::record_store_degraded("session_register");
                return GatewayError::StoreUnavailable(e).into_response();
            }
            tracing::debug!(request_id = %ctx.request_id, subject = %subject, "Login token registered");
        }
        response.into_response()
    }
}

/// Invalidate the caller's token.
#[derive(Debug, Clone)]
pub struct LogoutHandler {
    authenticator: Arc<dyn Authenticator>,
}

impl LogoutHandler {
    pub fn new(authenticator: Arc<dyn Authenticator>) -> Self {
        Self { authenticator }
    }
}

#[async_trait]
impl Handler for LogoutHandler {
    async fn handle(&self, ctx: RequestContext) -> Response {
        let Some(identity) = ctx.identity.as_ref() else {
            return GatewayError::Unauthenticated("Authentication required".into()).into_response();
        };
        match self.authenticator.invalidate(&identity.token).await {
            Ok(removed) => {
                tracing::info!(request_id = %ctx.request_id, subject = %identity.subject, removed, "Logged out");
                Json(json!({"message": "Logged out"})).into_response()
            }
            Err(e) => {
                metrics::record_store_degraded("logout");
                GatewayError::StoreUnavailable(e).into_response()
            }
        }
    }
}

/// Clear the caller's rate-limit counters.
///
/// The address counter is always cleared; the subject counter too when a
/// valid bearer token is presented.
#[derive(Debug, Clone)]
pub struct ResetRateLimitHandler {
    limiter: RateLimiter,
    authenticator: Arc<dyn Authenticator>,
}

impl ResetRateLimitHandler {
    pub fn new(limiter: RateLimiter, authenticator: Arc<dyn Authenticator>) -> Self {
        Self { limiter, authenticator }
    }
}

#[async_trait]
impl Handler for ResetRateLimitHandler {
    async fn handle(&self, ctx: RequestContext) -> Response {
        let mut targets = vec![ctx.client.clone()];
        if let Some(token) = bearer_token(&ctx.request.headers) {
            if let Ok(TokenStatus::Valid(identity)) = self.authenticator.validate(token).await {
                targets.push(identity.client_identity());
            }
        }

        for target in &targets {
            if let Err(e) = self.limiter.reset(target).await {
                metrics::record_store_degraded("reset_rate_limit");
                return GatewayError::StoreUnavailable(e).into_response();
            }
        }
        Json(json!({"message": "Rate limit reset"})).into_response()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Liveness;

#[async_trait]
impl Handler for Liveness {
    async fn handle(&self, _ctx: RequestContext) -> Response {
        Json(json!({"status": "ok"})).into_response()
    }
}
