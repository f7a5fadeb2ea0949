use crate::model::{
    ClickRecord, DashboardTotals, Dimension, DimensionCount, Granularity, TimeRange,
    TimeSeriesPoint, TopSort, UrlTotals,
};
use async_trait::async_trait;
use hoplink_core::{ShortCode, StorageError};

type Result<T> = std::result::Result<T, StorageError>;

/// Columnar store port for click records.
///
/// Appends are single-record; duplicates from at-least-once delivery
/// are accepted and show up as inflated totals. Aggregates treat the
/// store as the source of truth for analytics (the primary relation
/// store stays authoritative for the mapping's own counter).
#[async_trait]
pub trait ClickStore: Send + Sync + 'static {
    /// Appends one enriched record.
    async fn append(&self, record: &ClickRecord) -> Result<()>;

    /// Bounded probe for an existing `(short_code, session_id)` pair,
    /// used by unique-visitor detection.
    async fn session_exists(&self, code: &ShortCode, session_id: &str) -> Result<bool>;

    /// Totals for one code over the range.
    async fn totals(&self, code: &ShortCode, range: &TimeRange) -> Result<UrlTotals>;

    /// Clicks per bucket. `code = None` aggregates over all codes
    /// (the dashboard timeline).
    async fn time_series(
        &self,
        code: Option<&ShortCode>,
        range: &TimeRange,
        granularity: Granularity,
    ) -> Result<Vec<TimeSeriesPoint>>;

    /// Top values of one dimension by clicks, with their percentage of
    /// the counted rows. `code = None` spans all codes.
    async fn breakdown(
        &self,
        code: Option<&ShortCode>,
        dimension: Dimension,
        range: &TimeRange,
        limit: usize,
    ) -> Result<Vec<DimensionCount>>;

    /// Per-code totals ordered by the sort key.
    async fn top_urls(
        &self,
        range: &TimeRange,
        limit: usize,
        sort: TopSort,
    ) -> Result<Vec<UrlTotals>>;

    /// Scalar dashboard totals over the range.
    async fn dashboard_totals(&self, range: &TimeRange) -> Result<DashboardTotals>;
}
