//! API gateway library.
//!
//! Two deployment roles share this crate:
//! - the gateway: per-route pipelines (logging, authentication, access
//!   control, rate limiting) in front of the users, orders and documents
//!   services, each a round-robin pool with failover
//! - the front balancer: the same dispatcher with one catch-all route over
//!   a pool of gateway instances

// Core subsystems
pub mod config;
pub mod error;
pub mod http;
pub mod pipeline;
pub mod proxy;
pub mod routing;

// Traffic management
pub mod load_balancer;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod security;
pub mod store;

pub mod admin;

pub use config::GatewayConfig;
pub use error::{GatewayError, GatewayResult};
pub use http::{BalancerServer, GatewayServer};
pub use lifecycle::Shutdown;
