use crate::model::{
    Dashboard, Dimension, Granularity, TimeRange, TopSort, UrlStatsReport, UrlTotals,
};
use crate::store::ClickStore;
use hoplink_core::{Error, Result, ShortCode};
use std::sync::Arc;
use tracing::debug;

/// Breakdown rows returned per dimension.
const BREAKDOWN_LIMIT: usize = 10;
/// Countries shown on the dashboard.
const DASHBOARD_COUNTRY_LIMIT: usize = 5;
const DEFAULT_TOP_LIMIT: usize = 10;
const MAX_TOP_LIMIT: usize = 100;

/// Aggregation queries over the columnar store.
///
/// Empty ranges (`end < start`) produce zeros and empty arrays, never
/// an error.
#[derive(Debug, Clone)]
pub struct AnalyticsService<S> {
    store: Arc<S>,
}

impl<S: ClickStore> AnalyticsService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Full statistics for one short code: totals, the bucketed time
    /// series, and the top-10 breakdowns with percentages.
    pub async fn url_stats(
        &self,
        code: &str,
        range: TimeRange,
        granularity: Granularity,
    ) -> Result<UrlStatsReport> {
        let code = ShortCode::new(code)?;
        if range.is_empty() {
            return Ok(UrlStatsReport::empty(code.as_str()));
        }

        debug!(code = %code, ?granularity, "computing URL stats");

        let totals = self.store.totals(&code, &range).await?;
        let time_series = self
            .store
            .time_series(Some(&code), &range, granularity)
            .await?;
        let countries = self
            .store
            .breakdown(Some(&code), Dimension::Country, &range, BREAKDOWN_LIMIT)
            .await?;
        let devices = self
            .store
            .breakdown(Some(&code), Dimension::Device, &range, BREAKDOWN_LIMIT)
            .await?;
        let browsers = self
            .store
            .breakdown(Some(&code), Dimension::Browser, &range, BREAKDOWN_LIMIT)
            .await?;
        let referrers = self
            .store
            .breakdown(Some(&code), Dimension::Referrer, &range, BREAKDOWN_LIMIT)
            .await?;

        Ok(UrlStatsReport {
            totals,
            time_series,
            countries,
            devices,
            browsers,
            referrers,
        })
    }

    /// Per-code totals ordered by the sort key. `limit = 0` selects
    /// the default of 10; values beyond 100 are invalid.
    pub async fn top_urls(
        &self,
        limit: u32,
        range: TimeRange,
        sort: TopSort,
    ) -> Result<Vec<UrlTotals>> {
        let limit = match limit as usize {
            0 => DEFAULT_TOP_LIMIT,
            n if n > MAX_TOP_LIMIT => {
                return Err(Error::InvalidInput(format!(
                    "limit must be between 1 and {MAX_TOP_LIMIT}, got {n}"
                )))
            }
            n => n,
        };

        if range.is_empty() {
            return Ok(Vec::new());
        }

        self.store
            .top_urls(&range, limit, sort)
            .await
            .map_err(Error::from)
    }

    /// The dashboard aggregate: scalar totals, the daily timeline, the
    /// top 5 countries, and the device breakdown.
    pub async fn dashboard(&self, range: TimeRange) -> Result<Dashboard> {
        if range.is_empty() {
            return Ok(Dashboard::empty());
        }

        let totals = self.store.dashboard_totals(&range).await?;
        let click_timeline = self
            .store
            .time_series(None, &range, Granularity::Day)
            .await?;
        let top_countries = self
            .store
            .breakdown(None, Dimension::Country, &range, DASHBOARD_COUNTRY_LIMIT)
            .await?;
        let device_breakdown = self
            .store
            .breakdown(None, Dimension::Device, &range, BREAKDOWN_LIMIT)
            .await?;

        Ok(Dashboard {
            totals,
            click_timeline,
            top_countries,
            device_breakdown,
        })
    }
}
