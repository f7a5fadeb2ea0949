use crate::error::StorageError;
use crate::mapping::{CacheEntry, MappingPatch, OwnerQuery, Page, UrlMapping};
use crate::shortcode::ShortCode;
use async_trait::async_trait;

type Result<T> = std::result::Result<T, StorageError>;

/// Read operations over the authoritative mapping table.
#[async_trait]
pub trait ReadRepository: Send + Sync + 'static {
    /// Retrieves the mapping for a short code regardless of its
    /// `active` flag. Returns `None` if the code was never minted.
    async fn get(&self, code: &ShortCode) -> Result<Option<UrlMapping>>;

    /// Retrieves the mapping only if it is still active. Expiry is not
    /// checked here; callers decide how to report expired mappings.
    async fn get_active(&self, code: &ShortCode) -> Result<Option<UrlMapping>>;

    /// Whether a short code exists, active or not.
    async fn exists(&self, code: &ShortCode) -> Result<bool>;
}

/// Full access to the authoritative mapping table.
#[async_trait]
pub trait Repository: ReadRepository {
    /// Inserts a new mapping. Returns `Err(Conflict)` when the short
    /// code is already taken, including by a soft-deleted row.
    async fn insert(&self, mapping: &UrlMapping) -> Result<()>;

    /// Applies a partial update to an active mapping owned by anyone.
    /// Returns the updated mapping, or `None` if the code is absent or
    /// soft-deleted. Ownership is enforced by the service layer.
    async fn update(&self, code: &ShortCode, patch: MappingPatch) -> Result<Option<UrlMapping>>;

    /// Soft-deletes a mapping (`active = false`). Returns `true` if an
    /// active row was transitioned.
    async fn soft_delete(&self, code: &ShortCode) -> Result<bool>;

    /// Pages through a single owner's mappings. Implementations fetch
    /// `page_size + 1` rows and drop the tail to compute `has_next`
    /// without a second count query.
    async fn list_by_owner(&self, owner_id: &str, query: OwnerQuery)
        -> Result<Page<UrlMapping>>;

    /// Atomically bumps the click counter and stamps `last_accessed`.
    async fn increment_click(&self, code: &ShortCode) -> Result<()>;

    /// Reads the authoritative click counter.
    async fn click_count(&self, code: &ShortCode) -> Result<Option<u64>>;
}

/// The resolver's narrow port over mapping data.
///
/// The resolver shares the shortener's table but only through this
/// interface; implementations typically decorate a [`Repository`] with
/// a cache.
#[async_trait]
pub trait ResolverStore: Send + Sync + 'static {
    /// Cache-first lookup of the resolution projection. Inactive rows
    /// surface as `None` from the primary store but may appear as
    /// `active = false` entries from the cache; expired entries are
    /// returned as-is for the caller to classify.
    async fn resolve(&self, code: &ShortCode) -> Result<Option<CacheEntry>>;

    /// Fire-and-forget counter bump on the primary store plus a
    /// best-effort bump of the cached snapshot.
    async fn increment_click(&self, code: &ShortCode) -> Result<()>;

    /// Click count, preferring the cached snapshot.
    async fn get_click_count(&self, code: &ShortCode) -> Result<Option<u64>>;

    /// Loads the given codes into the cache. Returns how many mappings
    /// were warmed.
    async fn prewarm(&self, codes: &[ShortCode]) -> Result<usize>;

    /// Drops a cached projection so the next read refetches.
    async fn invalidate(&self, code: &ShortCode) -> Result<()>;
}
