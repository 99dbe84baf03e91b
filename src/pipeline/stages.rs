//! Concrete pipeline stages.

use std::sync::Arc;

use async_trait::async_trait;
use axum::response::IntoResponse;
use serde_json::Value;

use crate::error::GatewayError;
use crate::observability::metrics;
use crate::pipeline::context::RequestContext;
use crate::pipeline::stage::{Flow, Stage};
use crate::security::{bearer_token, AccessPolicy, Authenticator, RateLimiter, TokenStatus};

fn terminate(err: GatewayError) -> Flow {
    Flow::Terminate(err.into_response())
}

/// Require a valid bearer token.
#[derive(Debug, Clone)]
pub struct Authenticate {
    authenticator: Arc<dyn Authenticator>,
}

impl Authenticate {
    pub fn new(authenticator: Arc<dyn Authenticator>) -> Self {
        Self { authenticator }
    }
}

#[async_trait]
impl Stage for Authenticate {
    fn name(&self) -> &'static str {
        "authenticate"
    }

    async fn run(&self, mut ctx: RequestContext) -> Flow {
        let Some(token) = bearer_token(&ctx.request.headers).map(str::to_string) else {
            return terminate(GatewayError::Unauthenticated(
                "Missing or malformed Authorization header".into(),
            ));
        };

        match self.authenticator.validate(&token).await {
            Ok(TokenStatus::Valid(identity)) => {
                tracing::debug!(request_id = %ctx.request_id, subject = %identity.subject, "Authenticated");
                ctx.authenticate(identity);
                Flow::Continue(ctx)
            }
            Ok(TokenStatus::Expired) => terminate(GatewayError::Unauthenticated("Token has expired".into())),
            Ok(TokenStatus::Invalid) => terminate(GatewayError::Unauthenticated("Invalid token".into())),
            Err(e) => {
                metrics::record_store_degraded("authenticate");
                terminate(GatewayError::StoreUnavailable(e))
            }
        }
    }
}

/// Apply the configured authorization policy to the authenticated caller.
#[derive(Debug, Clone)]
pub struct Authorize {
    policy: AccessPolicy,
}

impl Authorize {
    pub fn new(policy: AccessPolicy) -> Self {
        Self { policy }
    }
}

#[async_trait]
impl Stage for Authorize {
    fn name(&self) -> &'static str {
        "authorize"
    }

    async fn run(&self, ctx: RequestContext) -> Flow {
        let Some(identity) = ctx.identity.as_ref() else {
            return terminate(GatewayError::Unauthenticated("Authentication required".into()));
        };
        if self.policy.permits(identity, &ctx.request.headers) {
            Flow::Continue(ctx)
        } else {
            tracing::info!(
                request_id = %ctx.request_id,
                subject = %identity.subject,
                policy = self.policy.name(),
                "Authorization denied"
            );
            terminate(GatewayError::Unauthorized("Unauthorized".into()))
        }
    }
}

/// Count the request against the caller's quota.
#[derive(Debug, Clone)]
pub struct RateLimit {
    limiter: RateLimiter,
}

impl RateLimit {
    pub fn new(limiter: RateLimiter) -> Self {
        Self { limiter }
    }
}

#[async_trait]
impl Stage for RateLimit {
    fn name(&self) -> &'static str {
        "rate_limit"
    }

    async fn run(&self, ctx: RequestContext) -> Flow {
        match self.limiter.check(&ctx.client).await {
            Ok(()) => Flow::Continue(ctx),
            Err(e) => terminate(e),
        }
    }
}

/// Reject JSON bodies missing any of `fields`.
#[derive(Debug, Clone)]
pub struct RequireFields {
    fields: Vec<&'static str>,
}

impl RequireFields {
    pub fn new(fields: &[&'static str]) -> Self {
        Self {
            fields: fields.to_vec(),
        }
    }
}

#[async_trait]
impl Stage for RequireFields {
    fn name(&self) -> &'static str {
        "require_fields"
    }

    async fn run(&self, ctx: RequestContext) -> Flow {
        let Some(Value::Object(body)) = ctx.request.json_body() else {
            return terminate(GatewayError::Validation("Request body must be a JSON object".into()));
        };
        let missing: Vec<&str> = self
            .fields
            .iter()
            .copied()
            .filter(|f| body.get(*f).map_or(true, |v| v.is_null() || v.as_str() == Some("")))
            .collect();
        if missing.is_empty() {
            Flow::Continue(ctx)
        } else {
            terminate(GatewayError::Validation(format!(
                "Missing required fields: {}",
                missing.join(", ")
            )))
        }
    }
}
