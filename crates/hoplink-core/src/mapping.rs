use crate::error::Error;
use crate::shortcode::ShortCode;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Upper bound on metadata entries per mapping.
pub const MAX_METADATA_ENTRIES: usize = 16;
/// Upper bound on the serialized metadata size in bytes.
pub const MAX_METADATA_BYTES: usize = 4096;
/// Default TTL for cached URL projections.
pub const URL_PROJECTION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// The authoritative record linking a short code to its long URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrlMapping {
    pub short_code: ShortCode,
    pub long_url: String,
    /// Opaque caller-supplied identifier of the creator. Exact string
    /// equality with this value authorizes mutating operations.
    pub owner_id: String,
    pub created_at: Timestamp,
    /// Absent means the mapping never expires.
    pub expires_at: Option<Timestamp>,
    /// Monotonically non-decreasing; approximate on the read path,
    /// authoritative in the primary store.
    pub click_count: u64,
    pub last_accessed: Option<Timestamp>,
    /// `false` after soft-deletion. Terminal.
    pub active: bool,
    pub metadata: BTreeMap<String, String>,
}

impl UrlMapping {
    /// Whether the mapping is past its expiry at `now`.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Projection of a [`UrlMapping`] stored in the shared cache.
///
/// Deliberately a fixed record rather than arbitrary JSON so the fast
/// path never deserializes unbounded data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub long_url: String,
    pub active: bool,
    pub expires_at: Option<Timestamp>,
    /// Snapshot of the click counter. Readers must treat this as a
    /// lower bound of the authoritative count.
    pub click_count: u64,
    pub cached_at: Timestamp,
}

impl CacheEntry {
    pub fn from_mapping(mapping: &UrlMapping, now: Timestamp) -> Self {
        Self {
            long_url: mapping.long_url.clone(),
            active: mapping.active,
            expires_at: mapping.expires_at,
            click_count: mapping.click_count,
            cached_at: now,
        }
    }

    /// Whether the cached mapping is past its expiry at `now`.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// TTL for a cached projection: 24 hours, or the time until the
/// mapping expires, whichever is sooner.
pub fn cache_ttl(expires_at: Option<Timestamp>, now: Timestamp) -> Duration {
    match expires_at {
        Some(at) if at > now => {
            let until = at.duration_since(now);
            let until = Duration::try_from(until).unwrap_or(Duration::ZERO);
            until.min(URL_PROJECTION_TTL)
        }
        Some(_) => Duration::ZERO,
        None => URL_PROJECTION_TTL,
    }
}

/// Validates the metadata bounds: at most [`MAX_METADATA_ENTRIES`]
/// entries and [`MAX_METADATA_BYTES`] serialized bytes.
pub fn validate_metadata(metadata: &BTreeMap<String, String>) -> Result<(), Error> {
    if metadata.len() > MAX_METADATA_ENTRIES {
        return Err(Error::InvalidInput(format!(
            "metadata has {} entries, at most {} are allowed",
            metadata.len(),
            MAX_METADATA_ENTRIES
        )));
    }

    let serialized = serde_json::to_vec(metadata)
        .map_err(|e| Error::InvalidInput(format!("metadata is not serializable: {e}")))?;
    if serialized.len() > MAX_METADATA_BYTES {
        return Err(Error::InvalidInput(format!(
            "metadata serializes to {} bytes, at most {} are allowed",
            serialized.len(),
            MAX_METADATA_BYTES
        )));
    }

    Ok(())
}

/// Partial update of a mapping. Absent fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct MappingPatch {
    pub long_url: Option<String>,
    pub expires_at: Option<Timestamp>,
    pub metadata: Option<BTreeMap<String, String>>,
}

impl MappingPatch {
    pub fn is_empty(&self) -> bool {
        self.long_url.is_none() && self.expires_at.is_none() && self.metadata.is_none()
    }
}

/// Sort key for owner listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortBy {
    #[default]
    CreatedAt,
    ClickCount,
}

/// Sort direction for owner listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Validated pagination parameters for `ListByOwner`.
#[derive(Debug, Clone, Copy)]
pub struct OwnerQuery {
    pub page: u32,
    pub page_size: u32,
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
}

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

impl Default for OwnerQuery {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            sort_by: SortBy::default(),
            sort_order: SortOrder::default(),
        }
    }
}

impl OwnerQuery {
    /// Builds a query from wire values, where `0` means "not provided".
    pub fn new(
        page: u32,
        page_size: u32,
        sort_by: SortBy,
        sort_order: SortOrder,
    ) -> Result<Self, Error> {
        let page = if page == 0 { 1 } else { page };
        let page_size = if page_size == 0 {
            DEFAULT_PAGE_SIZE
        } else {
            page_size
        };
        if page_size > MAX_PAGE_SIZE {
            return Err(Error::InvalidInput(format!(
                "page_size must be between 1 and {MAX_PAGE_SIZE}, got {page_size}"
            )));
        }
        Ok(Self {
            page,
            page_size,
            sort_by,
            sort_order,
        })
    }

    /// Row offset of the first item on this page.
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.page_size)
    }
}

/// One page of results plus a look-ahead flag.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub has_next: bool,
}
