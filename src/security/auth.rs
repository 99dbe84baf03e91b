//! Bearer token authentication.
//!
//! Two strategies share one contract:
//! - `JwtAuthenticator`: HS256 tokens verified with a shared secret, no store
//!   round trip. Expiry is read from the `exp` claim.
//! - `SessionAuthenticator`: opaque tokens registered in the counter store
//!   under `auth_token:{token}` with a TTL. Existence means validity, so an
//!   expired session is indistinguishable from an unknown one and reports
//!   `Invalid`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::{header, HeaderMap};
use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::config::{AuthConfig, AuthStrategy};
use crate::security::identity::ClientIdentity;
use crate::store::{CounterStore, StoreError};

/// Claims read from a gateway JWT.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

/// Caller established by a valid token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthIdentity {
    pub subject: String,
    pub role: Option<String>,
    pub token: String,
}

impl AuthIdentity {
    pub fn client_identity(&self) -> ClientIdentity {
        ClientIdentity::from_subject(&self.subject)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenStatus {
    Valid(AuthIdentity),
    Invalid,
    Expired,
}

#[async_trait]
pub trait Authenticator: Send + Sync + std::fmt::Debug {
    /// Classify `token`. Only store failures are errors.
    async fn validate(&self, token: &str) -> Result<TokenStatus, StoreError>;

    /// Revoke `token`. Returns true when a live session was removed.
    async fn invalidate(&self, token: &str) -> Result<bool, StoreError>;

    /// Record a token freshly issued for `subject`.
    async fn register(&self, _token: &str, _subject: &str) -> Result<(), StoreError> {
        Ok(())
    }

    fn strategy(&self) -> AuthStrategy;
}

/// Extract the token from `Authorization: Bearer <token>`.
///
/// Any other shape (missing header, wrong scheme, empty token, non-ASCII)
/// yields `None`.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

pub struct JwtAuthenticator {
    key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for JwtAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtAuthenticator")
            .field("leeway", &self.validation.leeway)
            .finish_non_exhaustive()
    }
}

impl JwtAuthenticator {
    pub fn new(secret: &str, issuer: Option<&str>, leeway_secs: u64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = leeway_secs;
        if let Some(iss) = issuer {
            // set_issuer alone lets a token without `iss` through.
            validation.set_issuer(&[iss]);
            validation.set_required_spec_claims(&["exp", "iss"]);
        }
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }
}

#[async_trait]
impl Authenticator for JwtAuthenticator {
    async fn validate(&self, token: &str) -> Result<TokenStatus, StoreError> {
        match decode::<Claims>(token, &self.key, &self.validation) {
            Ok(data) => Ok(TokenStatus::Valid(AuthIdentity {
                subject: data.claims.sub,
                role: data.claims.role,
                token: token.to_string(),
            })),
            Err(e) if matches!(e.kind(), ErrorKind::ExpiredSignature) => Ok(TokenStatus::Expired),
            Err(e) => {
                tracing::debug!(error = %e, "JWT rejected");
                Ok(TokenStatus::Invalid)
            }
        }
    }

    async fn invalidate(&self, _token: &str) -> Result<bool, StoreError> {
        Ok(false)
    }

    fn strategy(&self) -> AuthStrategy {
        AuthStrategy::Jwt
    }
}

#[derive(Debug)]
pub struct SessionAuthenticator {
    store: Arc<dyn CounterStore>,
    ttl: Duration,
}

impl SessionAuthenticator {
    pub fn new(store: Arc<dyn CounterStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    fn key(token: &str) -> String {
        format!("auth_token:{}", token)
    }
}

#[async_trait]
impl Authenticator for SessionAuthenticator {
    async fn validate(&self, token: &str) -> Result<TokenStatus, StoreError> {
        Ok(match self.store.get(&Self::key(token)).await? {
            Some(subject) => TokenStatus::Valid(AuthIdentity {
                subject,
                role: None,
                token: token.to_string(),
            }),
            None => TokenStatus::Invalid,
        })
    }

    async fn invalidate(&self, token: &str) -> Result<bool, StoreError> {
        self.store.delete(&Self::key(token)).await
    }

    async fn register(&self, token: &str, subject: &str) -> Result<(), StoreError> {
        self.store.set_ex(&Self::key(token), subject, self.ttl).await
    }

    fn strategy(&self) -> AuthStrategy {
        AuthStrategy::Session
    }
}

pub fn from_config(config: &AuthConfig, store: Arc<dyn CounterStore>) -> Arc<dyn Authenticator> {
    match config.strategy {
        AuthStrategy::Jwt => Arc::new(JwtAuthenticator::new(
            &config.jwt_secret,
            config.jwt_issuer.as_deref(),
            config.leeway_secs,
        )),
        AuthStrategy::Session => Arc::new(SessionAuthenticator::new(
            store,
            Duration::from_secs(config.session_ttl_secs),
        )),
    }
}
