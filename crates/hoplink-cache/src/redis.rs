use crate::retry::{with_retry, RetryPolicy};
use async_trait::async_trait;
use hoplink_core::{CacheEntry, CacheError, SharedCache, ShortCode, UrlCache};
use redis::AsyncCommands;
use std::time::Duration;
use tracing::{debug, trace, warn};

type Result<T> = std::result::Result<T, CacheError>;

/// Redis-backed implementation of both cache ports.
///
/// URL projections are stored as JSON under `url:short:<code>`;
/// [`SharedCache`] operations take full keys so the session-marker and
/// counter key schemas stay with their owners. Transient errors are
/// retried with exponential backoff (3 attempts, 8 ms - 512 ms).
#[derive(Debug, Clone)]
pub struct RedisCache {
    conn: redis::aio::MultiplexedConnection,
    url_prefix: String,
    retry: RetryPolicy,
}

fn map_redis_error(operation: &str, err: redis::RedisError) -> CacheError {
    let message = format!("{operation}: {err}");
    if err.is_timeout() {
        CacheError::Timeout(message)
    } else if matches!(err.kind(), redis::ErrorKind::IoError) {
        CacheError::Unavailable(message)
    } else {
        CacheError::Operation(message)
    }
}

impl RedisCache {
    /// Wraps an existing multiplexed connection.
    pub fn new(conn: redis::aio::MultiplexedConnection) -> Self {
        Self {
            conn,
            url_prefix: "url:short:".to_string(),
            retry: RetryPolicy::default(),
        }
    }

    /// Opens a new connection to the given cache URL.
    pub async fn connect(cache_url: &str) -> Result<Self> {
        let client = redis::Client::open(cache_url)
            .map_err(|e| CacheError::Unavailable(format!("invalid cache url: {e}")))?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| map_redis_error("failed to connect to Redis", e))?;
        Ok(Self::new(conn))
    }

    /// Overrides the retry policy (mostly for tests).
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn url_key(&self, code: &ShortCode) -> String {
        format!("{}{}", self.url_prefix, code.as_str())
    }
}

#[async_trait]
impl UrlCache for RedisCache {
    async fn get_entry(&self, code: &ShortCode) -> Result<Option<CacheEntry>> {
        let key = self.url_key(code);
        trace!(code = %code, "fetching URL projection from Redis");

        let cached = with_retry("url get", self.retry, || {
            let mut conn = self.conn.clone();
            let key = key.clone();
            async move {
                conn.get::<_, Option<String>>(&key)
                    .await
                    .map_err(|e| map_redis_error("failed to fetch value from Redis", e))
            }
        })
        .await?;

        match cached {
            Some(raw) => match serde_json::from_str::<CacheEntry>(&raw) {
                Ok(entry) => {
                    debug!(code = %code, "cache hit in Redis");
                    Ok(Some(entry))
                }
                Err(e) => {
                    warn!(code = %code, error = %e, "failed to deserialize cached projection");
                    Err(CacheError::InvalidData(format!(
                        "invalid cached value for key '{key}': {e}"
                    )))
                }
            },
            None => {
                trace!(code = %code, "cache miss in Redis");
                Ok(None)
            }
        }
    }

    async fn set_entry(
        &self,
        code: &ShortCode,
        entry: &CacheEntry,
        ttl: Option<Duration>,
    ) -> Result<()> {
        let key = self.url_key(code);
        trace!(code = %code, "storing URL projection in Redis");

        let json = serde_json::to_string(entry).map_err(|e| {
            CacheError::Serialization(format!("failed to serialize cache value: {e}"))
        })?;

        with_retry("url set", self.retry, || {
            let mut conn = self.conn.clone();
            let key = key.clone();
            let json = json.clone();
            async move {
                let result = match ttl {
                    Some(ttl) => {
                        conn.set_ex::<_, _, ()>(&key, json, ttl.as_secs().max(1))
                            .await
                    }
                    None => conn.set::<_, _, ()>(&key, json).await,
                };
                result.map_err(|e| map_redis_error("failed to write value to Redis", e))
            }
        })
        .await?;

        debug!(code = %code, "cached projection in Redis");
        Ok(())
    }

    async fn set_entries(&self, entries: &[(ShortCode, CacheEntry, Duration)]) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut pipe = redis::pipe();
        for (code, entry, ttl) in entries {
            let json = serde_json::to_string(entry).map_err(|e| {
                CacheError::Serialization(format!("failed to serialize cache value: {e}"))
            })?;
            pipe.set_ex(self.url_key(code), json, ttl.as_secs().max(1));
        }

        with_retry("url set_entries", self.retry, || {
            let mut conn = self.conn.clone();
            let pipe = pipe.clone();
            async move {
                let _: () = pipe
                    .query_async(&mut conn)
                    .await
                    .map_err(|e| map_redis_error("failed pipelined write to Redis", e))?;
                Ok(())
            }
        })
        .await?;

        debug!(count = entries.len(), "cached projections in one pipeline");
        Ok(())
    }

    async fn del(&self, code: &ShortCode) -> Result<()> {
        let key = self.url_key(code);
        trace!(code = %code, "removing URL projection from Redis");

        with_retry("url del", self.retry, || {
            let mut conn = self.conn.clone();
            let key = key.clone();
            async move {
                conn.del::<_, ()>(&key)
                    .await
                    .map_err(|e| map_redis_error("failed to delete value from Redis", e))
            }
        })
        .await
    }

    async fn exists(&self, code: &ShortCode) -> Result<bool> {
        let key = self.url_key(code);

        with_retry("url exists", self.retry, || {
            let mut conn = self.conn.clone();
            let key = key.clone();
            async move {
                conn.exists::<_, bool>(&key)
                    .await
                    .map_err(|e| map_redis_error("failed to check key in Redis", e))
            }
        })
        .await
    }
}

#[async_trait]
impl SharedCache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        with_retry("get", self.retry, || {
            let mut conn = self.conn.clone();
            let key = key.to_string();
            async move {
                conn.get::<_, Option<String>>(&key)
                    .await
                    .map_err(|e| map_redis_error("failed to fetch value from Redis", e))
            }
        })
        .await
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()> {
        with_retry("set", self.retry, || {
            let mut conn = self.conn.clone();
            let key = key.to_string();
            let value = value.to_string();
            async move {
                let result = match ttl {
                    Some(ttl) => {
                        conn.set_ex::<_, _, ()>(&key, value, ttl.as_secs().max(1))
                            .await
                    }
                    None => conn.set::<_, _, ()>(&key, value).await,
                };
                result.map_err(|e| map_redis_error("failed to write value to Redis", e))
            }
        })
        .await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        with_retry("delete", self.retry, || {
            let mut conn = self.conn.clone();
            let key = key.to_string();
            async move {
                conn.del::<_, ()>(&key)
                    .await
                    .map_err(|e| map_redis_error("failed to delete value from Redis", e))
            }
        })
        .await
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        with_retry("exists", self.retry, || {
            let mut conn = self.conn.clone();
            let key = key.to_string();
            async move {
                conn.exists::<_, bool>(&key)
                    .await
                    .map_err(|e| map_redis_error("failed to check key in Redis", e))
            }
        })
        .await
    }

    async fn increment(&self, key: &str, delta: i64) -> Result<i64> {
        with_retry("increment", self.retry, || {
            let mut conn = self.conn.clone();
            let key = key.to_string();
            async move {
                conn.incr::<_, _, i64>(&key, delta)
                    .await
                    .map_err(|e| map_redis_error("failed to increment counter in Redis", e))
            }
        })
        .await
    }

    async fn set_if_absent(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<bool> {
        with_retry("set_if_absent", self.retry, || {
            let mut conn = self.conn.clone();
            let key = key.to_string();
            let value = value.to_string();
            async move {
                let mut cmd = redis::cmd("SET");
                cmd.arg(&key).arg(&value).arg("NX");
                if let Some(ttl) = ttl {
                    cmd.arg("EX").arg(ttl.as_secs().max(1));
                }
                let reply: Option<String> = cmd
                    .query_async(&mut conn)
                    .await
                    .map_err(|e| map_redis_error("failed conditional write to Redis", e))?;
                Ok(reply.is_some())
            }
        })
        .await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<()> {
        with_retry("expire", self.retry, || {
            let mut conn = self.conn.clone();
            let key = key.to_string();
            async move {
                conn.expire::<_, ()>(&key, ttl.as_secs().max(1) as i64)
                    .await
                    .map_err(|e| map_redis_error("failed to refresh TTL in Redis", e))
            }
        })
        .await
    }
}

// Unit coverage for the Redis paths lives in the resolver and
// analytics integration suites, which run against a disposable Redis
// container from hoplink-test-infra.
