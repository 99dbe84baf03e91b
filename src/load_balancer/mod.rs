//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Route matched → target service identified
//!     → mod.rs (ServiceRegistry: one pool per service)
//!     → pool.rs (UpstreamPool::select_and_forward)
//!         → round_robin.rs (shared cursor, one advance per request)
//!         → upstream.rs (attempt/failure counters)
//!     → ProxiedResponse, or 503 once every instance failed
//! ```
//!
//! # Design Decisions
//! - Instance lists are static configuration
//! - Failover only on connection errors; upstream 4xx/5xx are answers
//! - Each instance is tried at most once per inbound request

pub mod pool;
pub mod round_robin;
pub mod upstream;

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::config::ServicesConfig;

pub use pool::{PoolError, UpstreamPool};
pub use round_robin::RoundRobin;
pub use upstream::{Upstream, UpstreamStats};

/// Backend services fronted by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Service {
    Users,
    Orders,
    Documents,
}

impl Service {
    pub fn as_str(&self) -> &'static str {
        match self {
            Service::Users => "users",
            Service::Orders => "orders",
            Service::Documents => "documents",
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One pool per backend service.
#[derive(Debug)]
pub struct ServiceRegistry {
    users: Arc<UpstreamPool>,
    orders: Arc<UpstreamPool>,
    documents: Arc<UpstreamPool>,
}

impl ServiceRegistry {
    pub fn from_config(config: &ServicesConfig) -> Result<Self, PoolError> {
        Ok(Self {
            users: Arc::new(UpstreamPool::new(Service::Users.as_str(), &config.users.instances)?),
            orders: Arc::new(UpstreamPool::new(Service::Orders.as_str(), &config.orders.instances)?),
            documents: Arc::new(UpstreamPool::new(
                Service::Documents.as_str(),
                &config.documents.instances,
            )?),
        })
    }

    pub fn pool(&self, service: Service) -> &Arc<UpstreamPool> {
        match service {
            Service::Users => &self.users,
            Service::Orders => &self.orders,
            Service::Documents => &self.documents,
        }
    }

    pub fn pools(&self) -> [&Arc<UpstreamPool>; 3] {
        [&self.users, &self.orders, &self.documents]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_builds_one_pool_per_service() {
        let registry = ServiceRegistry::from_config(&ServicesConfig::default()).unwrap();
        assert_eq!(registry.pool(Service::Orders).name(), "orders");
        assert_eq!(registry.pools().len(), 3);
        assert!(registry.pools().iter().all(|p| !p.is_empty()));
    }
}
