//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the shared components from a validated config
//! - Hand them to the server as explicit, injected state
//!
//! # Design Decisions
//! - Fail fast: an unbuildable pool or store URL is fatal
//! - An unreachable store is not: it degrades at request time
//! - Components initialize in order, not concurrently

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::config::{ConfigError, GatewayConfig};
use crate::load_balancer::{PoolError, ServiceRegistry, UpstreamPool};
use crate::proxy::{Forward, HttpForwarder};
use crate::security::{auth, AccessPolicy, Authenticator, RateLimiter};
use crate::store::{self, CounterStore, StoreError};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Pool(#[from] PoolError),
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Everything the gateway pipeline shares across requests.
#[derive(Debug, Clone)]
pub struct GatewayComponents {
    pub store: Arc<dyn CounterStore>,
    pub limiter: RateLimiter,
    pub authenticator: Arc<dyn Authenticator>,
    pub policy: AccessPolicy,
    pub services: Arc<ServiceRegistry>,
    pub forwarder: Arc<dyn Forward>,
}

impl GatewayComponents {
    pub fn build(config: &GatewayConfig) -> Result<Self, StartupError> {
        let store = store::from_config(&config.store)?;
        Self::with_store(config, store)
    }

    /// Build around an existing store.
    pub fn with_store(config: &GatewayConfig, store: Arc<dyn CounterStore>) -> Result<Self, StartupError> {
        let limiter = RateLimiter::from_config(store.clone(), &config.rate_limit);
        let authenticator = auth::from_config(&config.auth, store.clone());
        let policy = AccessPolicy::from_config(&config.authorization);
        let services = Arc::new(ServiceRegistry::from_config(&config.services)?);
        let forwarder: Arc<dyn Forward> = Arc::new(upstream_forwarder(config));

        tracing::info!(
            strategy = ?authenticator.strategy(),
            policy = policy.name(),
            window_secs = limiter.window().as_secs(),
            max_requests = limiter.max_requests(),
            "Gateway components ready"
        );

        Ok(Self {
            store,
            limiter,
            authenticator,
            policy,
            services,
            forwarder,
        })
    }
}

/// Everything the front balancer needs.
#[derive(Debug, Clone)]
pub struct BalancerComponents {
    pub pool: Arc<UpstreamPool>,
    pub forwarder: Arc<dyn Forward>,
}

impl BalancerComponents {
    pub fn build(config: &GatewayConfig) -> Result<Self, StartupError> {
        let pool = Arc::new(UpstreamPool::new("gateway", &config.gateway.instances)?);
        tracing::info!(instances = pool.len(), "Front balancer pool ready");
        Ok(Self {
            pool,
            forwarder: Arc::new(upstream_forwarder(config)),
        })
    }
}

fn upstream_forwarder(config: &GatewayConfig) -> HttpForwarder {
    HttpForwarder::new(Duration::from_secs(config.timeouts.upstream_secs))
}

/// Bind `address`, naming it in the error.
pub async fn bind(address: &str) -> Result<tokio::net::TcpListener, StartupError> {
    tokio::net::TcpListener::bind(address)
        .await
        .map_err(|source| StartupError::Bind {
            address: address.to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_build() {
        let config = GatewayConfig::default();
        let components = GatewayComponents::build(&config).unwrap();
        assert_eq!(components.limiter.max_requests(), 20);
        assert_eq!(components.policy.name(), "allow_all");

        let balancer = BalancerComponents::build(&config).unwrap();
        assert_eq!(balancer.pool.len(), 3);
    }

    #[test]
    fn empty_service_pool_is_fatal() {
        let mut config = GatewayConfig::default();
        config.services.orders.instances.clear();
        assert!(matches!(GatewayComponents::build(&config), Err(StartupError::Pool(_))));
    }
}
