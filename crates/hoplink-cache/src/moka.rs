use async_trait::async_trait;
use hoplink_core::{CacheEntry, CacheError, ShortCode, UrlCache};
use moka::future::Cache;
use std::time::Duration;
use tracing::{debug, trace};

type Result<T> = std::result::Result<T, CacheError>;

/// In-process URL projection cache backed by Moka.
///
/// Suitable for single-node deployments and as the test stand-in for
/// the shared Redis cache. Expiration is cache-wide: per-entry TTLs
/// passed to `set_entry` are ignored in favor of the configured
/// time-to-live, which callers should set at or below the projection
/// TTL discipline.
#[derive(Debug, Clone)]
pub struct MokaUrlCache {
    cache: Cache<String, CacheEntry>,
}

impl MokaUrlCache {
    /// Creates a cache with the default capacity of 10,000 entries.
    pub fn new() -> Self {
        let cache = Cache::builder().max_capacity(10_000).build();
        Self { cache }
    }

    /// Creates a cache with a custom capacity.
    pub fn with_capacity(max_capacity: u64) -> Self {
        let cache = Cache::builder().max_capacity(max_capacity).build();
        Self { cache }
    }

    /// Creates a cache whose entries expire after `ttl`.
    pub fn with_ttl(max_capacity: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(ttl)
            .build();
        Self { cache }
    }
}

impl Default for MokaUrlCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UrlCache for MokaUrlCache {
    async fn get_entry(&self, code: &ShortCode) -> Result<Option<CacheEntry>> {
        let key = code.as_str().to_string();
        match self.cache.get(&key).await {
            Some(entry) => {
                debug!(code = %code, "cache hit in Moka");
                Ok(Some(entry))
            }
            None => {
                trace!(code = %code, "cache miss in Moka");
                Ok(None)
            }
        }
    }

    async fn set_entry(
        &self,
        code: &ShortCode,
        entry: &CacheEntry,
        _ttl: Option<Duration>,
    ) -> Result<()> {
        let key = code.as_str().to_string();
        self.cache.insert(key, entry.clone()).await;
        Ok(())
    }

    async fn del(&self, code: &ShortCode) -> Result<()> {
        let key = code.as_str().to_string();
        self.cache.invalidate(&key).await;
        Ok(())
    }

    async fn exists(&self, code: &ShortCode) -> Result<bool> {
        let key = code.as_str().to_string();
        Ok(self.cache.get(&key).await.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jiff::Timestamp;

    fn code(s: &str) -> ShortCode {
        ShortCode::new_unchecked(s)
    }

    fn entry(url: &str) -> CacheEntry {
        CacheEntry {
            long_url: url.to_string(),
            active: true,
            expires_at: None,
            click_count: 0,
            cached_at: Timestamp::now(),
        }
    }

    #[tokio::test]
    async fn get_and_set() {
        let cache = MokaUrlCache::new();
        let c = code("abc1234");

        assert!(cache.get_entry(&c).await.unwrap().is_none());

        cache.set_entry(&c, &entry("https://example.com"), None)
            .await
            .unwrap();

        let got = cache.get_entry(&c).await.unwrap().unwrap();
        assert_eq!(got.long_url, "https://example.com");
        assert!(cache.exists(&c).await.unwrap());
    }

    #[tokio::test]
    async fn del_removes_entry() {
        let cache = MokaUrlCache::new();
        let c = code("abc1234");

        cache.set_entry(&c, &entry("https://example.com"), None)
            .await
            .unwrap();
        cache.del(&c).await.unwrap();

        assert!(cache.get_entry(&c).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn del_is_idempotent() {
        let cache = MokaUrlCache::new();
        let c = code("abc1234");

        cache.del(&c).await.unwrap();
        cache.del(&c).await.unwrap();
    }

    #[tokio::test]
    async fn entries_expire_with_cache_ttl() {
        let cache = MokaUrlCache::with_ttl(100, Duration::from_millis(50));
        let c = code("abc1234");

        cache.set_entry(&c, &entry("https://example.com"), None)
            .await
            .unwrap();
        assert!(cache.exists(&c).await.unwrap());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(cache.get_entry(&c).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn bump_click_increments_snapshot() {
        let cache = MokaUrlCache::new();
        let c = code("abc1234");

        cache.set_entry(&c, &entry("https://example.com"), None)
            .await
            .unwrap();
        cache.bump_click(&c).await.unwrap();
        cache.bump_click(&c).await.unwrap();

        let got = cache.get_entry(&c).await.unwrap().unwrap();
        assert_eq!(got.click_count, 2);
    }

    #[tokio::test]
    async fn bump_click_on_missing_entry_is_a_noop() {
        let cache = MokaUrlCache::new();
        let c = code("abc1234");

        cache.bump_click(&c).await.unwrap();
        assert!(cache.get_entry(&c).await.unwrap().is_none());
    }
}
