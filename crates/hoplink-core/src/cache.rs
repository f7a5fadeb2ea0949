use crate::error::CacheError;
use crate::mapping::{cache_ttl, CacheEntry};
use crate::shortcode::ShortCode;
use async_trait::async_trait;
use jiff::Timestamp;
use std::time::Duration;

type Result<T> = std::result::Result<T, CacheError>;

/// Cache for URL projections, keyed by short code.
///
/// Implementations store [`CacheEntry`] values under the
/// `url:short:<code>` key schema.
#[async_trait]
pub trait UrlCache: Send + Sync + 'static {
    /// Get the cached projection. `Ok(None)` on a miss.
    async fn get_entry(&self, code: &ShortCode) -> Result<Option<CacheEntry>>;

    /// Store a projection with the given TTL. `None` lets the
    /// implementation apply its default expiration policy.
    async fn set_entry(
        &self,
        code: &ShortCode,
        entry: &CacheEntry,
        ttl: Option<Duration>,
    ) -> Result<()>;

    /// Bulk write of projections, applied in one round trip where the
    /// backend supports pipelining. Used by cache prewarming.
    async fn set_entries(&self, entries: &[(ShortCode, CacheEntry, Duration)]) -> Result<()> {
        for (code, entry, ttl) in entries {
            self.set_entry(code, entry, Some(*ttl)).await?;
        }
        Ok(())
    }

    /// Remove the cached projection.
    async fn del(&self, code: &ShortCode) -> Result<()>;

    /// Whether a projection is cached. Does not consult the repository.
    async fn exists(&self, code: &ShortCode) -> Result<bool>;

    /// Best-effort bump of the cached click snapshot. The snapshot is
    /// a lower bound; lost bumps are acceptable.
    async fn bump_click(&self, code: &ShortCode) -> Result<()> {
        if let Some(mut entry) = self.get_entry(code).await? {
            entry.click_count += 1;
            let ttl = cache_ttl(entry.expires_at, Timestamp::now());
            self.set_entry(code, &entry, Some(ttl)).await?;
        }
        Ok(())
    }
}

/// Flat string cache used for session markers and rolling counters.
///
/// This is the generic slice of the shared cache; the URL fast path
/// goes through [`UrlCache`] instead so its values stay fixed records.
#[async_trait]
pub trait SharedCache: Send + Sync + 'static {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;

    async fn exists(&self, key: &str) -> Result<bool>;

    /// Atomic add; creates the key at `delta` when absent. Returns the
    /// new value.
    async fn increment(&self, key: &str, delta: i64) -> Result<i64>;

    /// Stores the value only if the key is absent. Returns whether the
    /// write happened.
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<bool>;

    /// Refreshes the TTL of an existing key.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<()>;
}
