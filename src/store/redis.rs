//! Redis-backed counter store shared by every gateway instance.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, ErrorKind, RedisError};
use tokio::sync::OnceCell;

use crate::store::{CounterStore, StoreError};

/// INCR and set the TTL only on the first increment, in one round trip.
const INCR_WITH_EXPIRY: &str = r"
local count = redis.call('INCR', KEYS[1])
if count == 1 then
    redis.call('EXPIRE', KEYS[1], ARGV[1])
end
return count
";

/// Redis store with a lazily established, auto-reconnecting connection.
pub struct RedisStore {
    client: redis::Client,
    conn: OnceCell<ConnectionManager>,
    prefix: String,
    op_timeout: Duration,
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore")
            .field("prefix", &self.prefix)
            .field("connected", &self.conn.initialized())
            .finish()
    }
}

impl RedisStore {
    /// Create a store for `url`. Only the URL is checked here; the connection
    /// is opened on first use and retried on later calls if that fails.
    pub fn new(url: &str, prefix: String, op_timeout: Duration) -> Result<Self, StoreError> {
        let client = redis::Client::open(url).map_err(|e| classify(e, ""))?;
        Ok(Self {
            client,
            conn: OnceCell::new(),
            prefix,
            op_timeout,
        })
    }

    fn key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    async fn connection(&self) -> Result<ConnectionManager, StoreError> {
        let conn = self
            .conn
            .get_or_try_init(|| ConnectionManager::new(self.client.clone()))
            .await
            .map_err(|e| classify(e, ""))?;
        Ok(conn.clone())
    }

    /// Run one store operation on the prefixed `key` under the configured deadline.
    async fn run<T, F, Fut>(&self, key: &str, op: F) -> Result<T, StoreError>
    where
        F: FnOnce(ConnectionManager, String) -> Fut,
        Fut: Future<Output = Result<T, RedisError>>,
    {
        let key = self.key(key);
        let attempt = async {
            let conn = self.connection().await?;
            op(conn, key.clone()).await.map_err(|e| classify(e, &key))
        };
        match tokio::time::timeout(self.op_timeout, attempt).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Unavailable(format!(
                "operation timed out after {:?}",
                self.op_timeout
            ))),
        }
    }
}

/// Map a redis error onto the store taxonomy.
fn classify(err: RedisError, key: &str) -> StoreError {
    let wrong_type = err.kind() == ErrorKind::TypeError
        || err.code() == Some("WRONGTYPE")
        || err.detail().is_some_and(|d| d.contains("not an integer"));
    if wrong_type {
        StoreError::WrongType {
            key: key.to_string(),
        }
    } else {
        StoreError::Unavailable(err.to_string())
    }
}

fn ttl_secs(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

#[async_trait]
impl CounterStore for RedisStore {
    async fn incr(&self, key: &str) -> Result<i64, StoreError> {
        self.run(key, |mut conn, key| async move { conn.incr(&key, 1i64).await })
            .await
    }

    async fn incr_with_expiry(&self, key: &str, ttl: Duration) -> Result<i64, StoreError> {
        self.run(key, |mut conn, key| async move {
            let script = redis::Script::new(INCR_WITH_EXPIRY);
            script
                .key(&key)
                .arg(ttl_secs(ttl))
                .invoke_async(&mut conn)
                .await
        })
        .await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, StoreError> {
        self.run(key, |mut conn, key| async move {
            conn.expire(&key, ttl_secs(ttl) as i64).await
        })
        .await
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let value = value.to_string();
        self.run(key, |mut conn, key| async move {
            conn.set_ex(&key, value, ttl_secs(ttl)).await
        })
        .await
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.run(key, |mut conn, key| async move { conn.get(&key).await })
            .await
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let removed: i64 = self
            .run(key, |mut conn, key| async move { conn.del(&key).await })
            .await?;
        Ok(removed > 0)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let _: String = self
            .run("", |mut conn, _| async move {
                redis::cmd("PING").query_async(&mut conn).await
            })
            .await?;
        Ok(())
    }
}
