use async_trait::async_trait;
use hoplink_core::{CacheError, SharedCache};
use jiff::Timestamp;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

type Result<T> = std::result::Result<T, CacheError>;

/// In-memory [`SharedCache`] with lazy TTL expiry, for unit tests.
#[derive(Debug, Clone, Default)]
pub struct MemorySharedCache {
    items: Arc<Mutex<HashMap<String, Slot>>>,
}

#[derive(Debug, Clone)]
struct Slot {
    value: String,
    expires_at: Option<Timestamp>,
}

impl Slot {
    fn live(&self, now: Timestamp) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

fn deadline(ttl: Option<Duration>) -> Result<Option<Timestamp>> {
    ttl.map(|ttl| {
        let ttl = jiff::SignedDuration::try_from(ttl)
            .map_err(|e| CacheError::Operation(format!("invalid ttl: {e}")))?;
        Ok(Timestamp::now() + ttl)
    })
    .transpose()
}

impl MemorySharedCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SharedCache for MemorySharedCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let now = Timestamp::now();
        let mut items = self.items.lock().await;
        match items.get(key) {
            Some(slot) if slot.live(now) => Ok(Some(slot.value.clone())),
            Some(_) => {
                items.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()> {
        let expires_at = deadline(ttl)?;
        let mut items = self.items.lock().await;
        items.insert(
            key.to_string(),
            Slot {
                value: value.to_string(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut items = self.items.lock().await;
        items.remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }

    async fn increment(&self, key: &str, delta: i64) -> Result<i64> {
        let now = Timestamp::now();
        let mut items = self.items.lock().await;
        let current = match items.get(key) {
            Some(slot) if slot.live(now) => slot
                .value
                .parse::<i64>()
                .map_err(|e| CacheError::InvalidData(format!("counter is not numeric: {e}")))?,
            _ => 0,
        };
        let next = current + delta;
        let expires_at = items.get(key).and_then(|slot| slot.expires_at);
        items.insert(
            key.to_string(),
            Slot {
                value: next.to_string(),
                expires_at,
            },
        );
        Ok(next)
    }

    async fn set_if_absent(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<bool> {
        if self.exists(key).await? {
            return Ok(false);
        }
        self.set(key, value, ttl).await?;
        Ok(true)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<()> {
        let expires_at = deadline(Some(ttl))?;
        let mut items = self.items.lock().await;
        if let Some(slot) = items.get_mut(key) {
            slot.expires_at = expires_at;
        }
        Ok(())
    }
}
