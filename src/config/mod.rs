//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize, GATEWAY_* env overrides)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → handed to startup, which builds the shared components
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load, ConfigError};
pub use schema::{
    AdminConfig, AuthConfig, AuthStrategy, AuthorizationConfig, AuthorizationMode,
    BalancerConfig, GatewayConfig, ListenerConfig, LogFormat, ObservabilityConfig,
    RateLimitConfig, ServiceConfig, ServicesConfig, StoreBackend, StoreConfig,
    StoreFailurePolicy,
};
