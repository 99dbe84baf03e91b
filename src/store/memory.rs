//! Process-local counter store.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::time::Instant;

use crate::store::{CounterStore, StoreError};

#[derive(Debug, Clone)]
enum Value {
    Int(i64),
    Text(String),
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn counter() -> Self {
        Self {
            value: Value::Int(0),
            expires_at: None,
        }
    }

    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| now < at)
    }

    fn render(&self) -> String {
        match &self.value {
            Value::Int(n) => n.to_string(),
            Value::Text(s) => s.clone(),
        }
    }
}

/// Minimum spacing between full sweeps of expired keys.
const SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// In-memory store with per-key expiry.
///
/// Expiry is evaluated lazily on access against `tokio::time::Instant`, so
/// paused test clocks drive it. Per-key operations run under the map's shard
/// lock, which makes increment-and-expire atomic. Writes also sweep expired
/// keys at most once per [`SWEEP_INTERVAL`], so identities that never come
/// back do not accumulate.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, Entry>,
    next_sweep: Mutex<Option<Instant>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Must not be called while holding a guard into `entries`.
    fn sweep_if_due(&self, now: Instant) {
        // Another writer already sweeping is as good as sweeping here.
        let Ok(mut next) = self.next_sweep.try_lock() else {
            return;
        };
        match *next {
            Some(at) if now < at => return,
            Some(_) => {
                let before = self.entries.len();
                self.entries.retain(|_, e| e.is_live(now));
                let removed = before.saturating_sub(self.entries.len());
                if removed > 0 {
                    tracing::trace!(removed, "Swept expired keys");
                }
            }
            None => {}
        }
        *next = Some(now + SWEEP_INTERVAL);
    }

    fn bump(&self, key: &str, ttl: Option<Duration>) -> Result<i64, StoreError> {
        let now = Instant::now();
        self.sweep_if_due(now);
        let mut entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(Entry::counter);
        if !entry.is_live(now) {
            *entry = Entry::counter();
        }
        let count = match &mut entry.value {
            Value::Int(n) => {
                *n += 1;
                *n
            }
            Value::Text(_) => {
                return Err(StoreError::WrongType {
                    key: key.to_string(),
                })
            }
        };
        if let (1, Some(ttl)) = (count, ttl) {
            entry.expires_at = Some(now + ttl);
        }
        Ok(count)
    }
}

#[async_trait]
impl CounterStore for MemoryStore {
    async fn incr(&self, key: &str) -> Result<i64, StoreError> {
        self.bump(key, None)
    }

    async fn incr_with_expiry(&self, key: &str, ttl: Duration) -> Result<i64, StoreError> {
        self.bump(key, Some(ttl))
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, StoreError> {
        let now = Instant::now();
        if let Some(mut entry) = self.entries.get_mut(key) {
            if entry.is_live(now) {
                entry.expires_at = Some(now + ttl);
                return Ok(true);
            }
        }
        self.entries.remove_if(key, |_, e| !e.is_live(now));
        Ok(false)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let now = Instant::now();
        self.sweep_if_due(now);
        self.entries.insert(
            key.to_string(),
            Entry {
                value: Value::Text(value.to_string()),
                expires_at: Some(now + ttl),
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let now = Instant::now();
        match self.entries.get(key) {
            Some(entry) if entry.is_live(now) => return Ok(Some(entry.render())),
            Some(_) => {}
            None => return Ok(None),
        }
        self.entries.remove_if(key, |_, e| !e.is_live(now));
        Ok(None)
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let now = Instant::now();
        Ok(self
            .entries
            .remove(key)
            .is_some_and(|(_, entry)| entry.is_live(now)))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
