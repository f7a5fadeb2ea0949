use crate::mint::CodeMinter;
use hoplink_core::mapping::{cache_ttl, validate_metadata, CacheEntry, MappingPatch, OwnerQuery, Page};
use hoplink_core::{Error, Result, ShortCode, UrlCache, UrlMapping};
use hoplink_core::repository::Repository;
use hoplink_core::target::validate_long_url;
use hoplink_core::StorageError;
use jiff::Timestamp;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Mint attempts before giving up with `ExhaustedCodeSpace`.
const MAX_MINT_ATTEMPTS: u32 = 10;

/// Parameters for creating a shortened URL.
#[derive(Debug, Clone)]
pub struct ShortenParams {
    pub long_url: String,
    pub owner_id: String,
    pub custom_alias: Option<String>,
    pub expires_at: Option<Timestamp>,
    pub metadata: BTreeMap<String, String>,
}

/// The shortener's business logic over a repository, a cache, and a
/// code minter.
///
/// The repository is authoritative; the cache is a projection written
/// through on creation and invalidated eagerly on mutation. Cache
/// failures degrade to logging, never to a failed call.
#[derive(Debug, Clone)]
pub struct ShortenerService<R, C, M> {
    repository: Arc<R>,
    cache: Arc<C>,
    minter: Arc<M>,
}

impl<R, C, M> ShortenerService<R, C, M>
where
    R: Repository,
    C: UrlCache,
    M: CodeMinter,
{
    pub fn new(repository: R, cache: C, minter: M) -> Self {
        Self {
            repository: Arc::new(repository),
            cache: Arc::new(cache),
            minter: Arc::new(minter),
        }
    }

    /// Mints or validates a short code and persists the new mapping.
    pub async fn shorten(&self, params: ShortenParams) -> Result<UrlMapping> {
        validate_long_url(&params.long_url)?;
        require_owner(&params.owner_id)?;
        validate_metadata(&params.metadata)?;

        let now = Timestamp::now();
        let mut mapping = UrlMapping {
            short_code: ShortCode::new_unchecked(""),
            long_url: params.long_url,
            owner_id: params.owner_id,
            created_at: now,
            expires_at: params.expires_at,
            click_count: 0,
            last_accessed: None,
            active: true,
            metadata: params.metadata,
        };

        match params.custom_alias {
            Some(alias) => {
                // The unique constraint is the arbiter: concurrent
                // claims of the same alias resolve to one winner.
                mapping.short_code = ShortCode::new(alias)?;
                self.repository.insert(&mapping).await.map_err(Error::from)?;
            }
            None => self.mint_unique(&mut mapping).await?,
        }

        self.write_through(&mapping, now).await;
        debug!(code = %mapping.short_code, owner = %mapping.owner_id, "mapping created");
        Ok(mapping)
    }

    /// Returns the mapping for a short code.
    ///
    /// An empty `owner_id` is a public read-only query; a non-empty
    /// one must match the stored owner. The authoritative record comes
    /// from the primary store (the cache projection deliberately
    /// excludes owner and metadata); the projection is refreshed on
    /// the way out.
    pub async fn get_info(&self, code: &str, owner_id: &str) -> Result<UrlMapping> {
        let code = ShortCode::new(code)?;

        let mapping = self
            .repository
            .get(&code)
            .await
            .map_err(Error::from)?
            .ok_or(Error::NotFound)?;

        if !owner_id.is_empty() && mapping.owner_id != owner_id {
            return Err(Error::Unauthorized);
        }

        self.write_through(&mapping, Timestamp::now()).await;
        Ok(mapping)
    }

    /// Pages through one owner's active mappings.
    pub async fn list_by_owner(
        &self,
        owner_id: &str,
        query: OwnerQuery,
    ) -> Result<Page<UrlMapping>> {
        require_owner(owner_id)?;
        self.repository
            .list_by_owner(owner_id, query)
            .await
            .map_err(Error::from)
    }

    /// Applies a partial update to a mapping the caller owns.
    pub async fn update(
        &self,
        code: &str,
        owner_id: &str,
        patch: MappingPatch,
    ) -> Result<UrlMapping> {
        let code = ShortCode::new(code)?;
        require_owner(owner_id)?;

        if let Some(ref long_url) = patch.long_url {
            validate_long_url(long_url)?;
        }
        if let Some(ref metadata) = patch.metadata {
            validate_metadata(metadata)?;
        }

        let current = self.authorize(&code, owner_id).await?;
        if patch.is_empty() {
            return Ok(current);
        }

        let updated = self
            .repository
            .update(&code, patch)
            .await
            .map_err(Error::from)?
            .ok_or(Error::NotFound)?;

        // Invalidate after the primary-store mutation commits; a
        // reader in between sees stale data for at most one window.
        self.invalidate(&code).await;
        Ok(updated)
    }

    /// Soft-deletes a mapping the caller owns. Terminal.
    pub async fn delete(&self, code: &str, owner_id: &str) -> Result<()> {
        let code = ShortCode::new(code)?;
        require_owner(owner_id)?;

        self.authorize(&code, owner_id).await?;

        let deleted = self
            .repository
            .soft_delete(&code)
            .await
            .map_err(Error::from)?;
        if !deleted {
            return Err(Error::NotFound);
        }

        self.invalidate(&code).await;
        debug!(code = %code, "mapping soft-deleted");
        Ok(())
    }

    async fn mint_unique(&self, mapping: &mut UrlMapping) -> Result<()> {
        for _ in 0..MAX_MINT_ATTEMPTS {
            // Each attempt samples afresh; no portion of a colliding
            // draw is reused.
            mapping.short_code = self.minter.mint();

            match self.repository.insert(mapping).await {
                Ok(()) => return Ok(()),
                Err(StorageError::Conflict(_)) => continue,
                Err(err) => return Err(err.into()),
            }
        }
        Err(Error::ExhaustedCodeSpace(MAX_MINT_ATTEMPTS))
    }

    /// Checks that the mapping exists, is active, and belongs to the
    /// caller.
    async fn authorize(&self, code: &ShortCode, owner_id: &str) -> Result<UrlMapping> {
        let mapping = self
            .repository
            .get(code)
            .await
            .map_err(Error::from)?
            .ok_or(Error::NotFound)?;

        if mapping.owner_id != owner_id {
            return Err(Error::Unauthorized);
        }
        if !mapping.active {
            return Err(Error::NotFound);
        }
        Ok(mapping)
    }

    async fn write_through(&self, mapping: &UrlMapping, now: Timestamp) {
        let ttl = cache_ttl(mapping.expires_at, now);
        if ttl == Duration::ZERO {
            return;
        }

        let entry = CacheEntry::from_mapping(mapping, now);
        if let Err(e) = self
            .cache
            .set_entry(&mapping.short_code, &entry, Some(ttl))
            .await
        {
            warn!(code = %mapping.short_code, error = %e, "failed to cache mapping");
        }
    }

    async fn invalidate(&self, code: &ShortCode) {
        if let Err(e) = self.cache.del(code).await {
            warn!(code = %code, error = %e, "failed to invalidate cache entry");
        }
    }
}

fn require_owner(owner_id: &str) -> Result<()> {
    if owner_id.is_empty() {
        return Err(Error::InvalidInput(
            "owner_id is required for this operation".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mint::RandomCodeMinter;
    use hoplink_cache::MokaUrlCache;
    use hoplink_core::mapping::{SortBy, SortOrder};
    use hoplink_storage::InMemoryMappingStore;
    use jiff::SignedDuration;
    use std::sync::atomic::{AtomicUsize, Ordering};

    type Service<M = RandomCodeMinter> =
        ShortenerService<InMemoryMappingStore, MokaUrlCache, M>;

    fn service() -> Service {
        ShortenerService::new(
            InMemoryMappingStore::new(),
            MokaUrlCache::new(),
            RandomCodeMinter::new(),
        )
    }

    fn params(long_url: &str, owner: &str) -> ShortenParams {
        ShortenParams {
            long_url: long_url.to_string(),
            owner_id: owner.to_string(),
            custom_alias: None,
            expires_at: None,
            metadata: BTreeMap::new(),
        }
    }

    /// Minter that cycles through a fixed list of codes.
    struct ScriptedMinter {
        codes: Vec<&'static str>,
        next: AtomicUsize,
    }

    impl ScriptedMinter {
        fn new(codes: Vec<&'static str>) -> Self {
            Self {
                codes,
                next: AtomicUsize::new(0),
            }
        }
    }

    impl CodeMinter for ScriptedMinter {
        fn mint(&self) -> ShortCode {
            let i = self.next.fetch_add(1, Ordering::SeqCst);
            ShortCode::new_unchecked(self.codes[i.min(self.codes.len() - 1)])
        }
    }

    #[tokio::test]
    async fn shorten_mints_seven_character_code() {
        let svc = service();
        let mapping = svc.shorten(params("https://example.com/a", "u1")).await.unwrap();

        assert_eq!(mapping.short_code.as_str().len(), 7);
        assert!(mapping.expires_at.is_none());
        assert_eq!(mapping.click_count, 0);
        assert!(mapping.active);
    }

    #[tokio::test]
    async fn shorten_writes_projection_through() {
        let svc = service();
        let mapping = svc.shorten(params("https://example.com/a", "u1")).await.unwrap();

        let entry = svc
            .cache
            .get_entry(&mapping.short_code)
            .await
            .unwrap()
            .expect("projection should be cached");
        assert_eq!(entry.long_url, "https://example.com/a");
        assert!(entry.active);
    }

    #[tokio::test]
    async fn custom_alias_is_used_verbatim() {
        let svc = service();
        let mut p = params("https://example.com/a", "u1");
        p.custom_alias = Some("golang".to_string());

        let mapping = svc.shorten(p).await.unwrap();
        assert_eq!(mapping.short_code.as_str(), "golang");
    }

    #[tokio::test]
    async fn duplicate_alias_is_rejected() {
        let svc = service();
        let mut first = params("https://a.example", "o1");
        first.custom_alias = Some("golang".to_string());
        svc.shorten(first).await.unwrap();

        let mut second = params("https://b.example", "o2");
        second.custom_alias = Some("golang".to_string());
        let err = svc.shorten(second).await.unwrap_err();
        assert!(matches!(err, Error::AliasTaken(_)));
    }

    #[tokio::test]
    async fn concurrent_alias_claims_have_one_winner() {
        let svc = Arc::new(service());

        let mut handles = Vec::new();
        for i in 0..10 {
            let svc = Arc::clone(&svc);
            handles.push(tokio::spawn(async move {
                let mut p = params(&format!("https://example.com/{i}"), "u1");
                p.custom_alias = Some("contested".to_string());
                svc.shorten(p).await
            }));
        }

        let mut winners = 0;
        let mut conflicts = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => winners += 1,
                Err(Error::AliasTaken(_)) => conflicts += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!(winners, 1);
        assert_eq!(conflicts, 9);
    }

    #[tokio::test]
    async fn alias_length_bounds_are_validated() {
        let svc = service();
        for alias in ["ab", "abcdefghijk"] {
            let mut p = params("https://example.com", "u1");
            p.custom_alias = Some(alias.to_string());
            let err = svc.shorten(p).await.unwrap_err();
            assert!(matches!(err, Error::InvalidInput(_)), "alias: {alias}");
        }
    }

    #[tokio::test]
    async fn unsafe_urls_are_rejected() {
        let svc = service();
        for url in [
            "ftp://example.com",
            "http://127.0.0.1/x",
            "http://10.1.2.3/x",
            "not a url",
            "",
        ] {
            let err = svc.shorten(params(url, "u1")).await.unwrap_err();
            assert!(matches!(err, Error::InvalidInput(_)), "url: {url}");
        }
    }

    #[tokio::test]
    async fn shorten_requires_owner() {
        let svc = service();
        let err = svc.shorten(params("https://example.com", "")).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn oversized_metadata_is_rejected() {
        let svc = service();
        let mut p = params("https://example.com", "u1");
        p.metadata
            .insert("k".to_string(), "v".repeat(5000));
        let err = svc.shorten(p).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn collision_retries_with_fresh_draw() {
        let minter = ScriptedMinter::new(vec!["aaaaaaa", "aaaaaaa", "bbbbbbb"]);
        let svc: Service<ScriptedMinter> = ShortenerService::new(
            InMemoryMappingStore::new(),
            MokaUrlCache::new(),
            minter,
        );

        let first = svc.shorten(params("https://a.example", "u1")).await.unwrap();
        assert_eq!(first.short_code.as_str(), "aaaaaaa");

        // Second call collides once, then lands on the fresh draw.
        let second = svc.shorten(params("https://b.example", "u1")).await.unwrap();
        assert_eq!(second.short_code.as_str(), "bbbbbbb");
    }

    #[tokio::test]
    async fn mint_retries_are_bounded() {
        let minter = ScriptedMinter::new(vec!["aaaaaaa"]);
        let svc: Service<ScriptedMinter> = ShortenerService::new(
            InMemoryMappingStore::new(),
            MokaUrlCache::new(),
            minter,
        );

        svc.shorten(params("https://a.example", "u1")).await.unwrap();
        let err = svc.shorten(params("https://b.example", "u1")).await.unwrap_err();
        assert!(matches!(err, Error::ExhaustedCodeSpace(10)));
    }

    #[tokio::test]
    async fn get_info_round_trips_shorten() {
        let svc = service();
        let created = svc.shorten(params("https://example.com/a", "u1")).await.unwrap();

        let info = svc.get_info(created.short_code.as_str(), "u1").await.unwrap();
        assert_eq!(info.long_url, "https://example.com/a");
        assert_eq!(info.owner_id, "u1");
    }

    #[tokio::test]
    async fn get_info_with_empty_owner_is_public() {
        let svc = service();
        let created = svc.shorten(params("https://example.com/a", "u1")).await.unwrap();

        let info = svc.get_info(created.short_code.as_str(), "").await.unwrap();
        assert_eq!(info.owner_id, "u1");
    }

    #[tokio::test]
    async fn get_info_owner_mismatch_is_unauthorized() {
        let svc = service();
        let created = svc.shorten(params("https://example.com/a", "u1")).await.unwrap();

        let err = svc.get_info(created.short_code.as_str(), "u2").await.unwrap_err();
        assert!(matches!(err, Error::Unauthorized));
    }

    #[tokio::test]
    async fn get_info_unknown_code_is_not_found() {
        let svc = service();
        let err = svc.get_info("missing1", "").await.unwrap_err();
        assert!(matches!(err, Error::NotFound));
    }

    #[tokio::test]
    async fn update_replaces_url_and_invalidates_cache() {
        let svc = service();
        let created = svc.shorten(params("https://old.example", "u1")).await.unwrap();

        let patch = MappingPatch {
            long_url: Some("https://new.example".to_string()),
            ..Default::default()
        };
        let updated = svc
            .update(created.short_code.as_str(), "u1", patch)
            .await
            .unwrap();
        assert_eq!(updated.long_url, "https://new.example");

        let cached = svc.cache.get_entry(&created.short_code).await.unwrap();
        assert!(cached.is_none(), "projection must be invalidated");
    }

    #[tokio::test]
    async fn update_validates_replacement_url() {
        let svc = service();
        let created = svc.shorten(params("https://old.example", "u1")).await.unwrap();

        let patch = MappingPatch {
            long_url: Some("http://192.168.0.1/internal".to_string()),
            ..Default::default()
        };
        let err = svc
            .update(created.short_code.as_str(), "u1", patch)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn update_by_stranger_is_unauthorized() {
        let svc = service();
        let created = svc.shorten(params("https://example.com", "u1")).await.unwrap();

        let patch = MappingPatch {
            long_url: Some("https://evil.example".to_string()),
            ..Default::default()
        };
        let err = svc
            .update(created.short_code.as_str(), "u2", patch)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Unauthorized));
    }

    #[tokio::test]
    async fn delete_is_terminal_and_repeat_is_not_found() {
        let svc = service();
        let created = svc.shorten(params("https://example.com", "u1")).await.unwrap();

        svc.delete(created.short_code.as_str(), "u1").await.unwrap();

        let err = svc.delete(created.short_code.as_str(), "u1").await.unwrap_err();
        assert!(matches!(err, Error::NotFound));

        // Public reads still see the (inactive) record.
        let info = svc.get_info(created.short_code.as_str(), "").await.unwrap();
        assert!(!info.active);
    }

    #[tokio::test]
    async fn delete_by_stranger_is_unauthorized() {
        let svc = service();
        let created = svc.shorten(params("https://example.com", "u1")).await.unwrap();

        let err = svc.delete(created.short_code.as_str(), "u2").await.unwrap_err();
        assert!(matches!(err, Error::Unauthorized));
    }

    #[tokio::test]
    async fn delete_invalidates_cache() {
        let svc = service();
        let created = svc.shorten(params("https://example.com", "u1")).await.unwrap();
        assert!(svc.cache.get_entry(&created.short_code).await.unwrap().is_some());

        svc.delete(created.short_code.as_str(), "u1").await.unwrap();
        assert!(svc.cache.get_entry(&created.short_code).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn listing_pages_with_look_ahead() {
        let svc = service();
        for i in 0..25 {
            svc.shorten(params(&format!("https://example.com/{i}"), "u1"))
                .await
                .unwrap();
        }

        let query = OwnerQuery::new(1, 20, SortBy::CreatedAt, SortOrder::Desc).unwrap();
        let page = svc.list_by_owner("u1", query).await.unwrap();
        assert_eq!(page.items.len(), 20);
        assert!(page.has_next);

        let query = OwnerQuery::new(2, 20, SortBy::CreatedAt, SortOrder::Desc).unwrap();
        let page = svc.list_by_owner("u1", query).await.unwrap();
        assert_eq!(page.items.len(), 5);
        assert!(!page.has_next);
    }

    #[tokio::test]
    async fn expiring_mapping_gets_short_cache_ttl() {
        let svc = service();
        let mut p = params("https://example.com", "u1");
        p.expires_at = Some(Timestamp::now() + SignedDuration::from_secs(3600));

        let mapping = svc.shorten(p).await.unwrap();
        let entry = svc.cache.get_entry(&mapping.short_code).await.unwrap().unwrap();
        assert_eq!(entry.expires_at, mapping.expires_at);
    }

    #[tokio::test]
    async fn already_expired_mapping_is_not_cached() {
        let svc = service();
        let mut p = params("https://example.com", "u1");
        p.expires_at = Some(Timestamp::now() - SignedDuration::from_secs(1));

        let mapping = svc.shorten(p).await.unwrap();
        assert!(svc.cache.get_entry(&mapping.short_code).await.unwrap().is_none());
    }
}
