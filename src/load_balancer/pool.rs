//! Upstream pool with round-robin selection and failover.
//!
//! # Responsibilities
//! - Hold the fixed instance list of one service
//! - Pick a starting instance per request from the shared cursor
//! - Fail over on connection errors, trying each instance at most once

use std::sync::Arc;

use thiserror::Error;
use url::Url;

use crate::error::{GatewayError, GatewayResult, ALL_INSTANCES_UNAVAILABLE};
use crate::load_balancer::{
    round_robin::RoundRobin,
    upstream::{Upstream, UpstreamStats},
};
use crate::observability::metrics;
use crate::proxy::{Forward, ForwardContext, ProxiedRequest, ProxiedResponse};

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("pool {0} has no instances")]
    Empty(String),
    #[error("pool {pool}: invalid instance url {url}: {reason}")]
    InvalidUrl {
        pool: String,
        url: String,
        reason: String,
    },
}

/// Equivalent instances of one service.
#[derive(Debug)]
pub struct UpstreamPool {
    name: String,
    upstreams: Vec<Arc<Upstream>>,
    cursor: RoundRobin,
}

impl UpstreamPool {
    pub fn new(name: impl Into<String>, instances: &[String]) -> Result<Self, PoolError> {
        let name = name.into();
        if instances.is_empty() {
            return Err(PoolError::Empty(name));
        }
        let upstreams = instances
            .iter()
            .map(|raw| {
                Url::parse(raw)
                    .map(|url| Arc::new(Upstream::new(url)))
                    .map_err(|e| PoolError::InvalidUrl {
                        pool: name.clone(),
                        url: raw.clone(),
                        reason: e.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            name,
            upstreams,
            cursor: RoundRobin::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.upstreams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.upstreams.is_empty()
    }

    pub fn stats(&self) -> Vec<UpstreamStats> {
        self.upstreams.iter().map(|u| u.stats()).collect()
    }

    /// Forward `request` starting at the next instance in rotation.
    ///
    /// Any answer, including 4xx/5xx, is returned as soon as it arrives.
    /// Connection errors move on to the next instance; when every instance
    /// has failed the caller gets `UpstreamUnavailable`.
    pub async fn select_and_forward(
        &self,
        request: &ProxiedRequest,
        forwarder: &dyn Forward,
        ctx: &ForwardContext,
    ) -> GatewayResult<ProxiedResponse> {
        let len = self.upstreams.len();
        let start = self.cursor.next_start(len);

        for (attempt, index) in RoundRobin::failover_order(start, len).enumerate() {
            let upstream = &self.upstreams[index];
            upstream.record_attempt();

            match forwarder.forward(request, &upstream.base_url, ctx).await {
                Ok(response) => {
                    upstream.mark_success();
                    tracing::debug!(
                        pool = %self.name,
                        upstream = %upstream.base_url,
                        attempt = attempt + 1,
                        status = response.status.as_u16(),
                        "Upstream answered"
                    );
                    return Ok(response);
                }
                Err(e) => {
                    upstream.mark_failure();
                    metrics::record_upstream_failure(&self.name, &upstream.label());
                    tracing::warn!(
                        pool = %self.name,
                        upstream = %upstream.base_url,
                        attempt = attempt + 1,
                        error = %e,
                        "Upstream unreachable, trying next instance"
                    );
                }
            }
        }

        tracing::error!(pool = %self.name, instances = len, "All instances are unavailable");
        Err(GatewayError::UpstreamUnavailable(ALL_INSTANCES_UNAVAILABLE.to_string()))
    }
}
