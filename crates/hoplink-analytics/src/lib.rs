//! Click ingestion and aggregation queries for Hoplink.
//!
//! The ingester consumes `url.clicked` payloads, enriches them with
//! the user-agent taxonomy and a pluggable geo provider, detects
//! approximate uniqueness, and appends one [`ClickRecord`] per event
//! to the columnar store. The query service serves the aggregate
//! reads (per-URL stats, top URLs, dashboard) over the same store.

pub mod clickhouse;
pub mod enrich;
pub mod error;
pub mod geo;
pub mod ingester;
pub mod memory;
pub mod model;
pub mod service;
pub mod store;

pub use clickhouse::ClickHouseClickStore;
pub use enrich::{parse_user_agent, UserAgentInfo};
pub use error::IngestError;
pub use geo::{GeoInfo, GeoProvider, HeuristicGeoProvider};
pub use ingester::{ClickIngester, IngesterConfig};
pub use memory::MemoryClickStore;
pub use model::{
    ClickRecord, Dashboard, DashboardTotals, Dimension, DimensionCount, Granularity,
    TimeRange, TimeSeriesPoint, TopSort, UrlStatsReport, UrlTotals,
};
pub use service::AnalyticsService;
pub use store::ClickStore;
