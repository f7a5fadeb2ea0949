use hoplink_core::{CacheError, SharedCache, ShortCode};
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

type Result<T> = std::result::Result<T, CacheError>;

/// TTL for session markers used by unique-visitor detection.
pub const SESSION_MARKER_TTL: Duration = Duration::from_secs(24 * 60 * 60);
/// TTL for the rolling total-clicks counter.
pub const STATS_COUNTER_TTL: Duration = Duration::from_secs(60 * 60);
/// Retention for the per-code click counter the resolver maintains.
pub const RETAINED_COUNTER_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Session markers under `session:<code>:<session>`.
///
/// A marker means the session has already been counted for that code;
/// its presence flips `is_unique` to false for later deliveries.
pub struct SessionMarkers<C: ?Sized> {
    cache: Arc<C>,
}

impl<C: ?Sized> std::fmt::Debug for SessionMarkers<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionMarkers").finish_non_exhaustive()
    }
}

impl<C: ?Sized> Clone for SessionMarkers<C> {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
        }
    }
}

impl<C: SharedCache + ?Sized> SessionMarkers<C> {
    pub fn new(cache: Arc<C>) -> Self {
        Self { cache }
    }

    fn key(code: &ShortCode, session_id: &str) -> String {
        format!("session:{}:{}", code.as_str(), session_id)
    }

    /// Whether the session was already marked for this code.
    pub async fn seen(&self, code: &ShortCode, session_id: &str) -> Result<bool> {
        self.cache.exists(&Self::key(code, session_id)).await
    }

    /// Marks the session, returning `true` if this call created the
    /// marker.
    pub async fn mark(&self, code: &ShortCode, session_id: &str) -> Result<bool> {
        let created = self
            .cache
            .set_if_absent(&Self::key(code, session_id), "1", Some(SESSION_MARKER_TTL))
            .await?;
        trace!(code = %code, session_id, created, "session marker write");
        Ok(created)
    }
}

/// Rolling counters kept alongside the authoritative click counts.
pub struct RollingCounters<C: ?Sized> {
    cache: Arc<C>,
}

impl<C: ?Sized> std::fmt::Debug for RollingCounters<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RollingCounters").finish_non_exhaustive()
    }
}

impl<C: ?Sized> Clone for RollingCounters<C> {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
        }
    }
}

impl<C: SharedCache + ?Sized> RollingCounters<C> {
    pub fn new(cache: Arc<C>) -> Self {
        Self { cache }
    }

    /// Bumps `stats:<code>:total_clicks` (1 hour TTL). Used by the
    /// ingester after each persisted record.
    pub async fn bump_total(&self, code: &ShortCode) -> Result<i64> {
        let key = format!("stats:{}:total_clicks", code.as_str());
        let value = self.cache.increment(&key, 1).await?;
        self.cache.expire(&key, STATS_COUNTER_TTL).await?;
        Ok(value)
    }

    /// Bumps the 30-day retention counter the resolver keeps per code.
    pub async fn bump_retained(&self, code: &ShortCode) -> Result<i64> {
        let key = format!("clicks:counter:{}", code.as_str());
        let value = self.cache.increment(&key, 1).await?;
        self.cache.expire(&key, RETAINED_COUNTER_TTL).await?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemorySharedCache;

    fn code(s: &str) -> ShortCode {
        ShortCode::new_unchecked(s)
    }

    #[tokio::test]
    async fn marker_is_created_once() {
        let markers = SessionMarkers::new(Arc::new(MemorySharedCache::new()));
        let c = code("abc1234");

        assert!(!markers.seen(&c, "s1").await.unwrap());
        assert!(markers.mark(&c, "s1").await.unwrap());
        assert!(markers.seen(&c, "s1").await.unwrap());
        assert!(!markers.mark(&c, "s1").await.unwrap());
    }

    #[tokio::test]
    async fn markers_are_scoped_per_code() {
        let markers = SessionMarkers::new(Arc::new(MemorySharedCache::new()));

        assert!(markers.mark(&code("aaa1111"), "s1").await.unwrap());
        assert!(!markers.seen(&code("bbb2222"), "s1").await.unwrap());
    }

    #[tokio::test]
    async fn totals_accumulate() {
        let counters = RollingCounters::new(Arc::new(MemorySharedCache::new()));
        let c = code("abc1234");

        assert_eq!(counters.bump_total(&c).await.unwrap(), 1);
        assert_eq!(counters.bump_total(&c).await.unwrap(), 2);
        assert_eq!(counters.bump_retained(&c).await.unwrap(), 1);
    }
}
