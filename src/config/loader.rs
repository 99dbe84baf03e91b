//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid environment override {name}: {message}")]
    Env { name: &'static str, message: String },
    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration from an optional file, then apply `GATEWAY_*`
/// environment overrides and validate.
///
/// Without a file the defaults are used as the base.
pub fn load(path: Option<&Path>) -> Result<GatewayConfig, ConfigError> {
    let mut config = match path {
        Some(path) => toml::from_str(&fs::read_to_string(path)?)?,
        None => GatewayConfig::default(),
    };
    apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
    finish(config)
}

fn finish(config: GatewayConfig) -> Result<GatewayConfig, ConfigError> {
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Apply environment overrides using `lookup` to read variables.
pub fn apply_env_overrides<F>(config: &mut GatewayConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = lookup("GATEWAY_BIND_ADDRESS") {
        config.listener.bind_address = v;
    }
    if let Some(v) = lookup("GATEWAY_USERS_URLS") {
        config.services.users.instances = split_list(&v);
    }
    if let Some(v) = lookup("GATEWAY_ORDERS_URLS") {
        config.services.orders.instances = split_list(&v);
    }
    if let Some(v) = lookup("GATEWAY_DOCUMENTS_URLS") {
        config.services.documents.instances = split_list(&v);
    }
    if let Some(v) = lookup("GATEWAY_INSTANCES") {
        config.gateway.instances = split_list(&v);
    }
    if let Some(v) = lookup("GATEWAY_STORE_URL") {
        config.store.url = v;
    }
    if let Some(v) = lookup("GATEWAY_JWT_SECRET") {
        config.auth.jwt_secret = v;
    }
    if let Some(v) = lookup("GATEWAY_RATE_LIMIT_WINDOW_SECS") {
        config.rate_limit.window_secs = parse_number("GATEWAY_RATE_LIMIT_WINDOW_SECS", &v)?;
    }
    if let Some(v) = lookup("GATEWAY_RATE_LIMIT_MAX_REQUESTS") {
        config.rate_limit.max_requests = parse_number("GATEWAY_RATE_LIMIT_MAX_REQUESTS", &v)?;
    }
    Ok(())
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn parse_number(name: &'static str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse().map_err(|e: std::num::ParseIntError| ConfigError::Env {
        name,
        message: e.to_string(),
    })
}
