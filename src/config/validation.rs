//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check every upstream list is non-empty and made of plain http URLs
//! - Validate value ranges (window > 0, quota > 0, upstream timeout of 3 to 5 seconds)
//! - Check strategy-specific settings are present
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;

use url::Url;

use crate::config::schema::{
    AuthStrategy, AuthorizationMode, GatewayConfig, StoreBackend,
};

/// Accepted per-attempt upstream deadline, in seconds.
pub const UPSTREAM_TIMEOUT_SECS: std::ops::RangeInclusive<u64> = 3..=5;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_bind("listener.bind_address", &config.listener.bind_address, &mut errors);
    check_bind("gateway.bind_address", &config.gateway.bind_address, &mut errors);

    check_instances("services.users.instances", &config.services.users.instances, &mut errors);
    check_instances("services.orders.instances", &config.services.orders.instances, &mut errors);
    check_instances(
        "services.documents.instances",
        &config.services.documents.instances,
        &mut errors,
    );
    check_instances("gateway.instances", &config.gateway.instances, &mut errors);

    if config.rate_limit.window_secs == 0 {
        errors.push(ValidationError::new("rate_limit.window_secs", "must be greater than 0"));
    }
    if config.rate_limit.max_requests == 0 {
        errors.push(ValidationError::new("rate_limit.max_requests", "must be greater than 0"));
    }

    let upstream = config.timeouts.upstream_secs;
    if !UPSTREAM_TIMEOUT_SECS.contains(&upstream) {
        errors.push(ValidationError::new(
            "timeouts.upstream_secs",
            format!(
                "must be between {} and {}",
                UPSTREAM_TIMEOUT_SECS.start(),
                UPSTREAM_TIMEOUT_SECS.end()
            ),
        ));
    }
    if config.timeouts.request_secs < upstream {
        errors.push(ValidationError::new(
            "timeouts.request_secs",
            "must not be shorter than timeouts.upstream_secs",
        ));
    }

    if config.store.backend == StoreBackend::Redis && config.store.url.trim().is_empty() {
        errors.push(ValidationError::new("store.url", "required when store.backend = \"redis\""));
    }
    if config.store.timeout_ms == 0 {
        errors.push(ValidationError::new("store.timeout_ms", "must be greater than 0"));
    }

    match config.auth.strategy {
        AuthStrategy::Jwt if config.auth.jwt_secret.is_empty() => {
            errors.push(ValidationError::new("auth.jwt_secret", "required for the jwt strategy"));
        }
        AuthStrategy::Session if config.auth.session_ttl_secs == 0 => {
            errors.push(ValidationError::new(
                "auth.session_ttl_secs",
                "must be greater than 0 for the session strategy",
            ));
        }
        _ => {}
    }

    match config.authorization.mode {
        AuthorizationMode::SharedSecret => {
            if config.authorization.secret.is_empty() {
                errors.push(ValidationError::new(
                    "authorization.secret",
                    "required for the shared_secret mode",
                ));
            }
            if axum::http::HeaderName::from_bytes(config.authorization.header.as_bytes()).is_err() {
                errors.push(ValidationError::new("authorization.header", "not a valid header name"));
            }
        }
        AuthorizationMode::Roles if config.authorization.roles.is_empty() => {
            errors.push(ValidationError::new("authorization.roles", "required for the roles mode"));
        }
        _ => {}
    }

    if config.limits.max_body_bytes == 0 {
        errors.push(ValidationError::new("limits.max_body_bytes", "must be greater than 0"));
    }

    if config.admin.enabled {
        check_bind("admin.bind_address", &config.admin.bind_address, &mut errors);
        if config.admin.api_key.is_empty() {
            errors.push(ValidationError::new("admin.api_key", "required when admin is enabled"));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_bind(field: &str, value: &str, errors: &mut Vec<ValidationError>) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(field, format!("invalid socket address {:?}", value)));
    }
}

fn check_instances(field: &str, instances: &[String], errors: &mut Vec<ValidationError>) {
    if instances.is_empty() {
        errors.push(ValidationError::new(field, "at least one instance is required"));
        return;
    }
    for raw in instances {
        match Url::parse(raw) {
            Ok(url) if url.scheme() == "http" && url.host().is_some() => {}
            Ok(_) => errors.push(ValidationError::new(field, format!("{:?} is not an http URL", raw))),
            Err(e) => errors.push(ValidationError::new(field, format!("{:?}: {}", raw, e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(validate_config(&GatewayConfig::default()), Ok(()));
    }

    #[test]
    fn reports_every_problem() {
        let mut config = GatewayConfig::default();
        config.services.orders.instances.clear();
        config.rate_limit.window_secs = 0;
        config.timeouts.upstream_secs = 0;
        config.auth.jwt_secret.clear();

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"services.orders.instances"));
        assert!(fields.contains(&"rate_limit.window_secs"));
        assert!(fields.contains(&"timeouts.upstream_secs"));
        assert!(fields.contains(&"auth.jwt_secret"));
    }

    #[test]
    fn upstream_timeout_stays_within_three_to_five_seconds() {
        let mut config = GatewayConfig::default();
        for secs in [3, 4, 5] {
            config.timeouts.upstream_secs = secs;
            assert_eq!(validate_config(&config), Ok(()), "{}s should be accepted", secs);
        }
        for secs in [2, 6, 30] {
            config.timeouts.upstream_secs = secs;
            let errors = validate_config(&config).unwrap_err();
            assert_eq!(errors[0].field, "timeouts.upstream_secs");
            assert_eq!(errors[0].message, "must be between 3 and 5");
        }
    }

    #[test]
    fn rejects_non_http_instances() {
        let mut config = GatewayConfig::default();
        config.services.users.instances = vec![
            "ftp://files:21".into(),
            "not a url".into(),
            "https://users.internal".into(),
        ];
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.iter().all(|e| e.field == "services.users.instances"));
    }

    #[test]
    fn shared_secret_mode_needs_secret() {
        let mut config = GatewayConfig::default();
        config.authorization.mode = AuthorizationMode::SharedSecret;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "authorization.secret");
    }
}
