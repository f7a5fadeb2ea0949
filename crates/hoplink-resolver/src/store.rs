use async_trait::async_trait;
use hoplink_cache::RollingCounters;
use hoplink_core::mapping::{cache_ttl, CacheEntry};
use hoplink_core::repository::{Repository, ResolverStore};
use hoplink_core::{SharedCache, ShortCode, StorageError, UrlCache};
use jiff::Timestamp;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, trace, warn};

type Result<T> = std::result::Result<T, StorageError>;

/// Default deadline for a cache round trip on the resolve path.
pub const CACHE_DEADLINE: Duration = Duration::from_millis(50);
/// Default deadline for a primary-store round trip on the resolve path.
pub const STORE_DEADLINE: Duration = Duration::from_millis(200);

/// Repository decorator implementing the resolver's narrow port.
///
/// Reads go cache-first with a tight deadline; cache trouble degrades
/// to the primary store instead of failing the resolve. Primary-store
/// hits are written through so the next read stays on the fast path.
#[derive(Debug, Clone)]
pub struct CachedResolverStore<R, C> {
    repository: Arc<R>,
    cache: Arc<C>,
    counters: Option<RollingCounters<dyn SharedCache>>,
    cache_deadline: Duration,
    store_deadline: Duration,
}

impl<R: Repository, C: UrlCache> CachedResolverStore<R, C> {
    pub fn new(repository: R, cache: C) -> Self {
        Self {
            repository: Arc::new(repository),
            cache: Arc::new(cache),
            counters: None,
            cache_deadline: CACHE_DEADLINE,
            store_deadline: STORE_DEADLINE,
        }
    }

    /// Adds the 30-day retention counter bumped on every click.
    pub fn with_counters(mut self, shared: Arc<dyn SharedCache>) -> Self {
        self.counters = Some(RollingCounters::new(shared));
        self
    }

    /// Overrides the per-call deadlines (mostly for tests).
    pub fn with_deadlines(mut self, cache_deadline: Duration, store_deadline: Duration) -> Self {
        self.cache_deadline = cache_deadline;
        self.store_deadline = store_deadline;
        self
    }

    /// Returns a reference to the inner repository.
    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Returns a reference to the cache.
    pub fn cache(&self) -> &C {
        &self.cache
    }

    async fn cache_lookup(&self, code: &ShortCode) -> Option<CacheEntry> {
        match timeout(self.cache_deadline, self.cache.get_entry(code)).await {
            Ok(Ok(entry)) => entry,
            Ok(Err(e)) => {
                warn!(code = %code, error = %e, "cache error on resolve, degrading to primary store");
                None
            }
            Err(_) => {
                warn!(code = %code, "cache deadline elapsed on resolve, degrading to primary store");
                None
            }
        }
    }

    async fn write_through(&self, code: &ShortCode, entry: &CacheEntry) {
        let ttl = cache_ttl(entry.expires_at, Timestamp::now());
        if ttl == Duration::ZERO {
            return;
        }
        if let Err(e) = self.cache.set_entry(code, entry, Some(ttl)).await {
            warn!(code = %code, error = %e, "failed to repopulate cache");
        } else {
            debug!(code = %code, "repopulated cache from primary store");
        }
    }
}

#[async_trait]
impl<R: Repository, C: UrlCache> ResolverStore for CachedResolverStore<R, C> {
    async fn resolve(&self, code: &ShortCode) -> Result<Option<CacheEntry>> {
        trace!(code = %code, "resolving short code");

        if let Some(entry) = self.cache_lookup(code).await {
            debug!(code = %code, "cache hit on resolve");
            return Ok(Some(entry));
        }

        let mapping = timeout(self.store_deadline, self.repository.get_active(code))
            .await
            .map_err(|_| {
                StorageError::Timeout("primary store deadline elapsed on resolve".to_string())
            })??;

        let Some(mapping) = mapping else {
            trace!(code = %code, "short code not found");
            return Ok(None);
        };

        let entry = CacheEntry::from_mapping(&mapping, Timestamp::now());
        self.write_through(code, &entry).await;
        Ok(Some(entry))
    }

    async fn increment_click(&self, code: &ShortCode) -> Result<()> {
        // The primary-store increment is the authoritative one.
        self.repository.increment_click(code).await?;

        if let Err(e) = self.cache.bump_click(code).await {
            warn!(code = %code, error = %e, "failed to bump cached click snapshot");
        }

        if let Some(ref counters) = self.counters {
            if let Err(e) = counters.bump_retained(code).await {
                warn!(code = %code, error = %e, "failed to bump retention counter");
            }
        }

        Ok(())
    }

    async fn get_click_count(&self, code: &ShortCode) -> Result<Option<u64>> {
        if let Some(entry) = self.cache_lookup(code).await {
            return Ok(Some(entry.click_count));
        }
        self.repository.click_count(code).await
    }

    async fn prewarm(&self, codes: &[ShortCode]) -> Result<usize> {
        let now = Timestamp::now();
        let mut entries = Vec::with_capacity(codes.len());

        for code in codes {
            if let Some(mapping) = self.repository.get_active(code).await? {
                let ttl = cache_ttl(mapping.expires_at, now);
                if ttl > Duration::ZERO {
                    entries.push((code.clone(), CacheEntry::from_mapping(&mapping, now), ttl));
                }
            }
        }

        let warmed = entries.len();
        if let Err(e) = self.cache.set_entries(&entries).await {
            warn!(error = %e, "failed to prewarm cache");
        }
        debug!(requested = codes.len(), warmed, "prewarmed cache");
        Ok(warmed)
    }

    async fn invalidate(&self, code: &ShortCode) -> Result<()> {
        trace!(code = %code, "invalidating cache entry");
        if let Err(e) = self.cache.del(code).await {
            warn!(code = %code, error = %e, "failed to invalidate cache entry");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hoplink_cache::{MemorySharedCache, MokaUrlCache};
    use hoplink_core::UrlMapping;
    use hoplink_storage::InMemoryMappingStore;
    use jiff::SignedDuration;
    use std::collections::BTreeMap;

    fn code(s: &str) -> ShortCode {
        ShortCode::new_unchecked(s)
    }

    fn mapping(code_str: &str, url: &str) -> UrlMapping {
        UrlMapping {
            short_code: code(code_str),
            long_url: url.to_string(),
            owner_id: "u1".to_string(),
            created_at: Timestamp::now(),
            expires_at: None,
            click_count: 0,
            last_accessed: None,
            active: true,
            metadata: BTreeMap::new(),
        }
    }

    async fn store_with(
        mappings: &[UrlMapping],
    ) -> CachedResolverStore<InMemoryMappingStore, MokaUrlCache> {
        let repo = InMemoryMappingStore::new();
        for m in mappings {
            repo.insert(m).await.unwrap();
        }
        CachedResolverStore::new(repo, MokaUrlCache::new())
    }

    #[tokio::test]
    async fn miss_falls_back_and_repopulates() {
        let store = store_with(&[mapping("abc1234", "https://example.com")]).await;
        let c = code("abc1234");

        let entry = store.resolve(&c).await.unwrap().unwrap();
        assert_eq!(entry.long_url, "https://example.com");

        // Second read is served from the cache.
        assert!(store.cache.get_entry(&c).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn unknown_code_resolves_to_none() {
        let store = store_with(&[]).await;
        assert!(store.resolve(&code("missing1")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn soft_deleted_rows_do_not_resolve() {
        let store = store_with(&[mapping("abc1234", "https://example.com")]).await;
        let c = code("abc1234");
        store.repository.soft_delete(&c).await.unwrap();

        assert!(store.resolve(&c).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn cache_hit_skips_primary_store() {
        let store = store_with(&[]).await;
        let c = code("abc1234");

        // Seed only the cache; the repository knows nothing.
        let entry = CacheEntry {
            long_url: "https://cached.example".to_string(),
            active: true,
            expires_at: None,
            click_count: 5,
            cached_at: Timestamp::now(),
        };
        store.cache.set_entry(&c, &entry, None).await.unwrap();

        let got = store.resolve(&c).await.unwrap().unwrap();
        assert_eq!(got.long_url, "https://cached.example");
        assert_eq!(got.click_count, 5);
    }

    #[tokio::test]
    async fn increment_updates_primary_and_snapshot() {
        let store = store_with(&[mapping("abc1234", "https://example.com")]).await;
        let c = code("abc1234");
        store.resolve(&c).await.unwrap();

        store.increment_click(&c).await.unwrap();
        store.increment_click(&c).await.unwrap();

        assert_eq!(store.repository.click_count(&c).await.unwrap(), Some(2));
        let entry = store.cache.get_entry(&c).await.unwrap().unwrap();
        assert_eq!(entry.click_count, 2);
    }

    #[tokio::test]
    async fn retention_counter_is_bumped_when_configured() {
        let shared = Arc::new(MemorySharedCache::new());
        let repo = InMemoryMappingStore::new();
        repo.insert(&mapping("abc1234", "https://example.com"))
            .await
            .unwrap();
        let store = CachedResolverStore::new(repo, MokaUrlCache::new())
            .with_counters(shared.clone() as Arc<dyn SharedCache>);

        store.increment_click(&code("abc1234")).await.unwrap();

        let count = shared.get("clicks:counter:abc1234").await.unwrap();
        assert_eq!(count.as_deref(), Some("1"));
    }

    #[tokio::test]
    async fn click_count_prefers_cached_snapshot() {
        let store = store_with(&[mapping("abc1234", "https://example.com")]).await;
        let c = code("abc1234");

        // Stale snapshot in the cache reads as a lower bound.
        let entry = CacheEntry {
            long_url: "https://example.com".to_string(),
            active: true,
            expires_at: None,
            click_count: 3,
            cached_at: Timestamp::now(),
        };
        store.cache.set_entry(&c, &entry, None).await.unwrap();

        assert_eq!(store.get_click_count(&c).await.unwrap(), Some(3));
    }

    #[tokio::test]
    async fn click_count_falls_back_to_primary() {
        let store = store_with(&[mapping("abc1234", "https://example.com")]).await;
        let c = code("abc1234");
        store.repository.increment_click(&c).await.unwrap();

        assert_eq!(store.get_click_count(&c).await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn prewarm_loads_known_codes_only() {
        let store = store_with(&[
            mapping("aaa1111", "https://a.example"),
            mapping("bbb2222", "https://b.example"),
        ])
        .await;

        let warmed = store
            .prewarm(&[code("aaa1111"), code("bbb2222"), code("ccc3333")])
            .await
            .unwrap();
        assert_eq!(warmed, 2);
        assert!(store.cache.get_entry(&code("aaa1111")).await.unwrap().is_some());
        assert!(store.cache.get_entry(&code("ccc3333")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn invalidate_clears_cached_entry() {
        let store = store_with(&[mapping("abc1234", "https://example.com")]).await;
        let c = code("abc1234");
        store.resolve(&c).await.unwrap();

        store.invalidate(&c).await.unwrap();
        assert!(store.cache.get_entry(&c).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expired_mapping_is_returned_for_caller_to_classify() {
        let mut m = mapping("abc1234", "https://example.com");
        m.expires_at = Some(Timestamp::now() - SignedDuration::from_secs(10));
        let store = store_with(&[m]).await;

        let entry = store.resolve(&code("abc1234")).await.unwrap().unwrap();
        assert!(entry.is_expired(Timestamp::now()));

        // Expired entries are never written through.
        assert!(store.cache.get_entry(&code("abc1234")).await.unwrap().is_none());
    }
}
