//! Shared counter store subsystem.
//!
//! # Data Flow
//! ```text
//! Rate limiter ──incr_with_expiry──┐
//! Authenticator ──get/set_ex/delete─┼──▶ CounterStore
//! Reset handler ──delete────────────┘        │
//!                                            ├── memory.rs (DashMap, single process)
//!                                            └── redis.rs  (shared across instances)
//! ```
//!
//! # Design Decisions
//! - The store is a remote, possibly unavailable dependency: every operation
//!   returns `StoreError` and callers decide how to degrade
//! - `incr_with_expiry` is the one primitive the rate limiter needs; the
//!   expiry is attached only when the increment produced 1
//! - A value of the wrong shape is reported distinctly so callers can repair it

pub mod memory;
pub mod redis;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::{StoreBackend, StoreConfig};

pub use self::memory::MemoryStore;
pub use self::redis::RedisStore;

/// Failure of a counter store operation.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The store could not be reached or did not answer in time.
    #[error("counter store unavailable: {0}")]
    Unavailable(String),
    /// The key holds a value that is not an integer counter.
    #[error("key {key} holds a value of the wrong type")]
    WrongType { key: String },
}

/// Key-value store with atomic increment and expiry.
#[async_trait]
pub trait CounterStore: Send + Sync + std::fmt::Debug {
    /// Atomically increment the integer at `key`, creating it at 1 when absent.
    async fn incr(&self, key: &str) -> Result<i64, StoreError>;

    /// Increment `key` and, if the result is 1, attach `ttl` to it.
    ///
    /// Implementations override this when the store can do both in one
    /// atomic step.
    async fn incr_with_expiry(&self, key: &str, ttl: Duration) -> Result<i64, StoreError> {
        let count = self.incr(key).await?;
        if count == 1 {
            self.expire(key, ttl).await?;
        }
        Ok(count)
    }

    /// Attach `ttl` to an existing key. Returns false when the key is absent.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, StoreError>;

    /// Store a string value with an expiry.
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;

    /// Read a live value.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Remove a key. Returns true when a live key was removed.
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;

    /// Round-trip check used by status reporting.
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Build the configured store.
///
/// The Redis store connects lazily, so an unreachable server at startup only
/// surfaces as `StoreError::Unavailable` on first use.
pub fn from_config(config: &StoreConfig) -> Result<Arc<dyn CounterStore>, StoreError> {
    match config.backend {
        StoreBackend::Memory => {
            tracing::info!("Using in-memory counter store");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::Redis => {
            let store = RedisStore::new(
                &config.url,
                config.key_prefix.clone(),
                Duration::from_millis(config.timeout_ms),
            )?;
            tracing::info!(prefix = %config.key_prefix, "Using redis counter store");
            Ok(Arc::new(store))
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Store that fails every operation.
    #[derive(Debug)]
    pub(crate) struct DownStore;

    #[async_trait]
    impl CounterStore for DownStore {
        async fn incr(&self, _: &str) -> Result<i64, StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
        async fn expire(&self, _: &str, _: Duration) -> Result<bool, StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
        async fn set_ex(&self, _: &str, _: &str, _: Duration) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
        async fn get(&self, _: &str) -> Result<Option<String>, StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
        async fn delete(&self, _: &str) -> Result<bool, StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
        async fn ping(&self) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
    }
}
