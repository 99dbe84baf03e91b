//! Coarse authorization, evaluated after authentication.

use std::fmt;
use std::sync::Arc;

use axum::http::HeaderMap;

use crate::config::{AuthorizationConfig, AuthorizationMode};
use crate::security::auth::AuthIdentity;

type CheckFn = dyn Fn(&AuthIdentity, &HeaderMap) -> bool + Send + Sync;

/// Pluggable authorization predicate.
#[derive(Clone)]
pub struct AccessPolicy {
    name: &'static str,
    check: Arc<CheckFn>,
}

impl fmt::Debug for AccessPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessPolicy").field("name", &self.name).finish()
    }
}

impl AccessPolicy {
    pub fn custom<F>(name: &'static str, check: F) -> Self
    where
        F: Fn(&AuthIdentity, &HeaderMap) -> bool + Send + Sync + 'static,
    {
        Self {
            name,
            check: Arc::new(check),
        }
    }

    pub fn allow_all() -> Self {
        Self::custom("allow_all", |_, _| true)
    }

    /// Require `header` to carry exactly `secret`.
    pub fn shared_secret(header: String, secret: String) -> Self {
        Self::custom("shared_secret", move |_, headers| {
            headers
                .get(header.as_str())
                .is_some_and(|v| v.as_bytes() == secret.as_bytes())
        })
    }

    /// Require the caller's role to be one of `roles`.
    pub fn roles(roles: Vec<String>) -> Self {
        Self::custom("roles", move |identity, _| {
            identity
                .role
                .as_deref()
                .is_some_and(|role| roles.iter().any(|r| r == role))
        })
    }

    pub fn from_config(config: &AuthorizationConfig) -> Self {
        match config.mode {
            AuthorizationMode::AllowAll => Self::allow_all(),
            AuthorizationMode::SharedSecret => {
                Self::shared_secret(config.header.to_ascii_lowercase(), config.secret.clone())
            }
            AuthorizationMode::Roles => Self::roles(config.roles.clone()),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn permits(&self, identity: &AuthIdentity, headers: &HeaderMap) -> bool {
        (self.check)(identity, headers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn identity(role: Option<&str>) -> AuthIdentity {
        AuthIdentity {
            subject: "alice".into(),
            role: role.map(str::to_string),
            token: "t".into(),
        }
    }

    #[test]
    fn shared_secret_policy() {
        let config = AuthorizationConfig {
            mode: AuthorizationMode::SharedSecret,
            header: "X-Api-Key".into(),
            secret: "s3cret".into(),
            roles: vec![],
        };
        let policy = AccessPolicy::from_config(&config);
        let mut headers = HeaderMap::new();
        assert!(!policy.permits(&identity(None), &headers));

        headers.insert("x-api-key", HeaderValue::from_static("wrong"));
        assert!(!policy.permits(&identity(None), &headers));

        headers.insert("x-api-key", HeaderValue::from_static("s3cret"));
        assert!(policy.permits(&identity(None), &headers));
    }

    #[test]
    fn role_policy() {
        let policy = AccessPolicy::roles(vec!["admin".into(), "staff".into()]);
        let headers = HeaderMap::new();
        assert!(policy.permits(&identity(Some("staff")), &headers));
        assert!(!policy.permits(&identity(Some("guest")), &headers));
        assert!(!policy.permits(&identity(None), &headers));
    }

    #[test]
    fn custom_policy() {
        let policy = AccessPolicy::custom("only_alice", |id, _| id.subject == "alice");
        assert_eq!(policy.name(), "only_alice");
        assert!(policy.permits(&identity(None), &HeaderMap::new()));
        assert!(AccessPolicy::allow_all().permits(&identity(None), &HeaderMap::new()));
    }
}
