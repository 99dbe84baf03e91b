//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the API gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration for the gateway pipeline.
    pub listener: ListenerConfig,

    /// Backend services reachable behind the gateway.
    pub services: ServicesConfig,

    /// Front balancer over replicated gateway instances.
    pub gateway: BalancerConfig,

    /// Shared counter store (rate-limit counters, session tokens).
    pub store: StoreConfig,

    /// Rate limiting configuration.
    pub rate_limit: RateLimitConfig,

    /// Bearer token authentication.
    pub auth: AuthConfig,

    /// Coarse access control applied after authentication.
    pub authorization: AuthorizationConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Inbound request limits.
    pub limits: LimitsConfig,

    /// Client address handling.
    pub forwarding: ForwardingConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Admin API settings.
    pub admin: AdminConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:5000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:5000".to_string(),
        }
    }
}

/// A replicated backend service.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
    /// Base URLs of the equivalent replicas (e.g., "http://127.0.0.1:5001").
    pub instances: Vec<String>,
}

impl ServiceConfig {
    fn single(url: &str) -> Self {
        Self {
            instances: vec![url.to_string()],
        }
    }
}

/// The backend services the gateway fronts.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServicesConfig {
    /// User and login service.
    pub users: ServiceConfig,

    /// Order service.
    pub orders: ServiceConfig,

    /// Document service.
    pub documents: ServiceConfig,
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            users: ServiceConfig::single("http://127.0.0.1:5001"),
            orders: ServiceConfig::single("http://127.0.0.1:5002"),
            documents: ServiceConfig::single("http://127.0.0.1:5003"),
        }
    }
}

/// Front balancer configuration (`balance` mode).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BalancerConfig {
    /// Bind address of the front balancer.
    pub bind_address: String,

    /// Gateway instances to spread traffic over.
    pub instances: Vec<String>,
}

impl Default for BalancerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8000".to_string(),
            instances: vec![
                "http://127.0.0.1:4998".to_string(),
                "http://127.0.0.1:4999".to_string(),
                "http://127.0.0.1:5000".to_string(),
            ],
        }
    }
}

/// Which counter store implementation to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Process-local store. Counters are not shared between gateway instances.
    #[default]
    Memory,
    /// Redis, shared by every gateway instance.
    Redis,
}

/// Counter store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Store implementation.
    pub backend: StoreBackend,

    /// Redis URL (redis:// or rediss://).
    pub url: String,

    /// Prefix prepended to every key.
    pub key_prefix: String,

    /// Deadline for a single store operation in milliseconds.
    pub timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            url: "redis://127.0.0.1:6379".to_string(),
            key_prefix: String::new(),
            timeout_ms: 500,
        }
    }
}

/// What to do with a request when the counter store cannot be reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreFailurePolicy {
    /// Admit the request and log a degradation event (fail-open).
    #[default]
    Allow,
    /// Reject the request with 503 (fail-closed).
    Deny,
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Fixed window length in seconds.
    pub window_secs: u64,

    /// Maximum requests per client per window.
    pub max_requests: u64,

    /// Behavior when the counter store is unavailable.
    pub on_store_failure: StoreFailurePolicy,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window_secs: 300,
            max_requests: 20,
            on_store_failure: StoreFailurePolicy::Allow,
        }
    }
}

/// Token validation strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AuthStrategy {
    /// Self-contained HS256 tokens verified with a shared secret.
    #[default]
    Jwt,
    /// Opaque tokens registered in the counter store with a TTL.
    Session,
}

/// Authentication configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Validation strategy for this deployment.
    pub strategy: AuthStrategy,

    /// Shared HS256 secret (jwt strategy).
    pub jwt_secret: String,

    /// Required `iss` claim, if any (jwt strategy).
    pub jwt_issuer: Option<String>,

    /// Clock skew tolerated on `exp` in seconds (jwt strategy).
    pub leeway_secs: u64,

    /// Lifetime of a registered session token in seconds (session strategy).
    pub session_ttl_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            strategy: AuthStrategy::Jwt,
            // WARNING: This is a placeholder! Change this in production.
            jwt_secret: "CHANGE_ME_IN_PRODUCTION".to_string(),
            jwt_issuer: None,
            leeway_secs: 0,
            session_ttl_secs: 3600,
        }
    }
}

/// Authorization policy selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationMode {
    /// Every authenticated caller is authorized.
    #[default]
    AllowAll,
    /// A fixed secret must be presented in `header`.
    SharedSecret,
    /// The token's `role` claim must be one of `roles`.
    Roles,
}

/// Authorization configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthorizationConfig {
    pub mode: AuthorizationMode,

    /// Header carrying the shared secret.
    pub header: String,

    /// Expected shared secret.
    pub secret: String,

    /// Roles admitted under the `roles` mode.
    pub roles: Vec<String>,
}

impl Default for AuthorizationConfig {
    fn default() -> Self {
        Self {
            mode: AuthorizationMode::AllowAll,
            header: "x-api-key".to_string(),
            secret: String::new(),
            roles: Vec::new(),
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Per-attempt deadline for an upstream call in seconds.
    pub upstream_secs: u64,

    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            upstream_secs: 5,
            request_secs: 30,
        }
    }
}

/// Inbound request limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 1024 * 1024, // 1MB
        }
    }
}

/// Client address handling.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ForwardingConfig {
    /// Use the first `X-Forwarded-For` entry as the client address.
    /// Only enable behind a trusted front balancer.
    pub trust_forwarded_for: bool,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}
