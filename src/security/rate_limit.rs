//! Fixed-window rate limiting backed by the shared counter store.
//!
//! Each client owns one counter at `rate_limit:{identity}`. The first request
//! of a window creates it with a TTL equal to the window; requests are
//! admitted while the post-increment count stays within the quota. The
//! counter is never decremented.

use std::sync::Arc;
use std::time::Duration;

use crate::config::{RateLimitConfig, StoreFailurePolicy};
use crate::error::{GatewayError, GatewayResult};
use crate::observability::metrics;
use crate::security::identity::ClientIdentity;
use crate::store::{CounterStore, StoreError};

/// Outcome of a single admission attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allowed { count: i64 },
    Denied { count: i64 },
}

impl Admission {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Admission::Allowed { .. })
    }
}

#[derive(Debug, Clone)]
pub struct RateLimiter {
    store: Arc<dyn CounterStore>,
    window: Duration,
    max_requests: i64,
    on_store_failure: StoreFailurePolicy,
}

impl RateLimiter {
    pub fn new(
        store: Arc<dyn CounterStore>,
        window: Duration,
        max_requests: u64,
        on_store_failure: StoreFailurePolicy,
    ) -> Self {
        Self {
            store,
            window,
            max_requests: i64::try_from(max_requests).unwrap_or(i64::MAX),
            on_store_failure,
        }
    }

    pub fn from_config(store: Arc<dyn CounterStore>, config: &RateLimitConfig) -> Self {
        Self::new(
            store,
            Duration::from_secs(config.window_secs),
            config.max_requests,
            config.on_store_failure,
        )
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn max_requests(&self) -> i64 {
        self.max_requests
    }

    /// Count one request for `identity` and decide on it.
    ///
    /// A counter holding a non-integer value is deleted and the increment is
    /// retried once. If the retry also fails on the value type the request is
    /// denied. Store outages are returned to the caller untouched.
    pub async fn admit(&self, identity: &ClientIdentity) -> Result<Admission, StoreError> {
        let key = identity.rate_limit_key();
        let count = match self.store.incr_with_expiry(&key, self.window).await {
            Ok(count) => count,
            Err(StoreError::WrongType { .. }) => {
                tracing::warn!(key = %key, "Rate limit counter held a non-integer value, resetting");
                self.store.delete(&key).await?;
                match self.store.incr_with_expiry(&key, self.window).await {
                    Ok(count) => count,
                    Err(StoreError::WrongType { .. }) => {
                        tracing::error!(key = %key, "Rate limit counter still corrupted after reset");
                        return Ok(Admission::Denied { count: 0 });
                    }
                    Err(e) => return Err(e),
                }
            }
            Err(e) => return Err(e),
        };

        if count <= self.max_requests {
            Ok(Admission::Allowed { count })
        } else {
            Ok(Admission::Denied { count })
        }
    }

    /// Admit a request, applying the configured store-failure policy.
    pub async fn check(&self, identity: &ClientIdentity) -> GatewayResult<()> {
        match self.admit(identity).await {
            Ok(Admission::Allowed { .. }) => Ok(()),
            Ok(Admission::Denied { count }) => {
                tracing::warn!(client = %identity, count, "Rate limit exceeded");
                metrics::record_rate_limited("quota");
                Err(GatewayError::RateLimitExceeded)
            }
            Err(e) => {
                metrics::record_store_degraded("rate_limit");
                match self.on_store_failure {
                    StoreFailurePolicy::Allow => {
                        tracing::warn!(client = %identity, error = %e, "Counter store unavailable, admitting request");
                        Ok(())
                    }
                    StoreFailurePolicy::Deny => Err(GatewayError::StoreUnavailable(e)),
                }
            }
        }
    }

    /// Delete the counter for `identity`, starting a fresh window.
    pub async fn reset(&self, identity: &ClientIdentity) -> Result<bool, StoreError> {
        let removed = self.store.delete(&identity.rate_limit_key()).await?;
        tracing::info!(client = %identity, removed, "Rate limit counter reset");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing::DownStore;
    use crate::store::MemoryStore;
    use async_trait::async_trait;

    fn client() -> ClientIdentity {
        ClientIdentity::from_ip("203.0.113.9".parse().unwrap())
    }

    fn limiter(store: Arc<dyn CounterStore>, max: u64) -> RateLimiter {
        RateLimiter::new(store, Duration::from_secs(300), max, StoreFailurePolicy::Allow)
    }

    /// Store whose counter can never be parsed as an integer.
    #[derive(Debug, Default)]
    struct CorruptStore {
        deletes: std::sync::atomic::AtomicUsize,
    }

    #[async_trait]
    impl CounterStore for CorruptStore {
        async fn incr(&self, key: &str) -> Result<i64, StoreError> {
            Err(StoreError::WrongType { key: key.to_string() })
        }
        async fn incr_with_expiry(&self, key: &str, _: Duration) -> Result<i64, StoreError> {
            Err(StoreError::WrongType { key: key.to_string() })
        }
        async fn expire(&self, _: &str, _: Duration) -> Result<bool, StoreError> {
            Ok(false)
        }
        async fn set_ex(&self, _: &str, _: &str, _: Duration) -> Result<(), StoreError> {
            Ok(())
        }
        async fn get(&self, _: &str) -> Result<Option<String>, StoreError> {
            Ok(Some("garbage".into()))
        }
        async fn delete(&self, _: &str) -> Result<bool, StoreError> {
            self.deletes.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(true)
        }
        async fn ping(&self) -> Result<(), StoreError> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn twentieth_allowed_twenty_first_denied() {
        let rl = limiter(Arc::new(MemoryStore::new()), 20);
        for n in 1..=20 {
            assert_eq!(rl.admit(&client()).await.unwrap(), Admission::Allowed { count: n });
        }
        assert_eq!(rl.admit(&client()).await.unwrap(), Admission::Denied { count: 21 });
        assert_eq!(rl.admit(&client()).await.unwrap(), Admission::Denied { count: 22 });
    }

    #[tokio::test(start_paused = true)]
    async fn window_expiry_restores_quota() {
        let rl = limiter(Arc::new(MemoryStore::new()), 2);
        assert!(rl.check(&client()).await.is_ok());
        assert!(rl.check(&client()).await.is_ok());
        assert!(matches!(rl.check(&client()).await, Err(GatewayError::RateLimitExceeded)));

        tokio::time::advance(Duration::from_secs(301)).await;
        assert_eq!(rl.admit(&client()).await.unwrap(), Admission::Allowed { count: 1 });
    }

    #[tokio::test]
    async fn clients_are_counted_independently() {
        let rl = limiter(Arc::new(MemoryStore::new()), 1);
        let other = ClientIdentity::from_subject("alice");
        assert!(rl.admit(&client()).await.unwrap().is_allowed());
        assert!(!rl.admit(&client()).await.unwrap().is_allowed());
        assert!(rl.admit(&other).await.unwrap().is_allowed());
    }

    #[tokio::test]
    async fn corrupted_counter_is_reset_and_retried() {
        let store = Arc::new(MemoryStore::new());
        store
            .set_ex(&client().rate_limit_key(), "not-a-number", Duration::from_secs(60))
            .await
            .unwrap();
        let rl = limiter(store, 20);
        assert_eq!(rl.admit(&client()).await.unwrap(), Admission::Allowed { count: 1 });
    }

    #[tokio::test]
    async fn persistent_corruption_denies() {
        let store = Arc::new(CorruptStore::default());
        let rl = limiter(store.clone(), 20);
        assert_eq!(rl.admit(&client()).await.unwrap(), Admission::Denied { count: 0 });
        assert_eq!(store.deletes.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn store_outage_follows_policy() {
        let open = RateLimiter::new(Arc::new(DownStore), Duration::from_secs(60), 5, StoreFailurePolicy::Allow);
        assert!(open.check(&client()).await.is_ok());

        let closed = RateLimiter::new(Arc::new(DownStore), Duration::from_secs(60), 5, StoreFailurePolicy::Deny);
        let err = closed.check(&client()).await.unwrap_err();
        assert_eq!(err.status_code(), 503);
    }

    #[tokio::test]
    async fn reset_starts_fresh_window() {
        let rl = limiter(Arc::new(MemoryStore::new()), 1);
        rl.admit(&client()).await.unwrap();
        assert!(!rl.admit(&client()).await.unwrap().is_allowed());

        assert!(rl.reset(&client()).await.unwrap());
        assert!(rl.admit(&client()).await.unwrap().is_allowed());
        assert!(!rl.reset(&ClientIdentity::from_subject("nobody")).await.unwrap());
    }
}
