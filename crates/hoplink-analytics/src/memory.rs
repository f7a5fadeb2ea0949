use crate::model::{
    ClickRecord, DashboardTotals, Dimension, DimensionCount, Granularity, TimeRange,
    TimeSeriesPoint, TopSort, UrlTotals,
};
use crate::store::ClickStore;
use async_trait::async_trait;
use hoplink_core::{ShortCode, StorageError};
use jiff::Timestamp;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;

type Result<T> = std::result::Result<T, StorageError>;

/// In-memory [`ClickStore`] with the full query semantics, for unit
/// tests and single-process setups.
#[derive(Debug, Clone, Default)]
pub struct MemoryClickStore {
    records: Arc<Mutex<Vec<ClickRecord>>>,
}

impl MemoryClickStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records (append-only, duplicates included).
    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }

    fn in_range(record: &ClickRecord, range: &TimeRange) -> bool {
        range.contains(record.occurred_at)
    }

    fn dimension_value(record: &ClickRecord, dimension: Dimension) -> Option<String> {
        match dimension {
            // Empty referrers collapse into the Direct bucket; other
            // dimensions skip empty values entirely.
            Dimension::Referrer => Some(if record.referrer.is_empty() {
                "Direct".to_string()
            } else {
                record.referrer.clone()
            }),
            Dimension::Country => non_empty(&record.country),
            Dimension::Device => non_empty(&record.device_type),
            Dimension::Browser => non_empty(&record.browser),
        }
    }

    fn totals_of(code: &str, records: &[&ClickRecord]) -> UrlTotals {
        let sessions: HashSet<&str> = records.iter().map(|r| r.session_id.as_str()).collect();
        UrlTotals {
            short_code: code.to_string(),
            total_clicks: records.len() as u64,
            unique_clicks: sessions.len() as u64,
            last_clicked: records.iter().map(|r| r.occurred_at).max(),
            first_seen: records.iter().map(|r| r.occurred_at).min(),
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

#[async_trait]
impl ClickStore for MemoryClickStore {
    async fn append(&self, record: &ClickRecord) -> Result<()> {
        self.records.lock().await.push(record.clone());
        Ok(())
    }

    async fn session_exists(&self, code: &ShortCode, session_id: &str) -> Result<bool> {
        let records = self.records.lock().await;
        Ok(records
            .iter()
            .any(|r| r.short_code == *code && r.session_id == session_id))
    }

    async fn totals(&self, code: &ShortCode, range: &TimeRange) -> Result<UrlTotals> {
        let records = self.records.lock().await;
        let matching: Vec<&ClickRecord> = records
            .iter()
            .filter(|r| r.short_code == *code && Self::in_range(r, range))
            .collect();
        Ok(Self::totals_of(code.as_str(), &matching))
    }

    async fn time_series(
        &self,
        code: Option<&ShortCode>,
        range: &TimeRange,
        granularity: Granularity,
    ) -> Result<Vec<TimeSeriesPoint>> {
        let records = self.records.lock().await;
        let mut buckets: BTreeMap<i64, (u64, HashSet<String>)> = BTreeMap::new();

        for record in records
            .iter()
            .filter(|r| code.is_none_or(|c| r.short_code == *c) && Self::in_range(r, range))
        {
            let bucket = granularity.bucket_start(record.occurred_at.as_second());
            let slot = buckets.entry(bucket).or_default();
            slot.0 += 1;
            slot.1.insert(record.session_id.clone());
        }

        Ok(buckets
            .into_iter()
            .map(|(bucket, (clicks, sessions))| TimeSeriesPoint {
                bucket,
                clicks,
                unique_clicks: sessions.len() as u64,
            })
            .collect())
    }

    async fn breakdown(
        &self,
        code: Option<&ShortCode>,
        dimension: Dimension,
        range: &TimeRange,
        limit: usize,
    ) -> Result<Vec<DimensionCount>> {
        let records = self.records.lock().await;
        let mut counts: HashMap<String, u64> = HashMap::new();

        for record in records
            .iter()
            .filter(|r| code.is_none_or(|c| r.short_code == *c) && Self::in_range(r, range))
        {
            if let Some(value) = Self::dimension_value(record, dimension) {
                *counts.entry(value).or_default() += 1;
            }
        }

        let denominator: u64 = counts.values().sum();
        let mut breakdown: Vec<DimensionCount> = counts
            .into_iter()
            .map(|(value, clicks)| DimensionCount {
                value,
                clicks,
                percentage: if denominator == 0 {
                    0.0
                } else {
                    clicks as f64 * 100.0 / denominator as f64
                },
            })
            .collect();

        breakdown.sort_by(|a, b| b.clicks.cmp(&a.clicks).then_with(|| a.value.cmp(&b.value)));
        breakdown.truncate(limit);
        Ok(breakdown)
    }

    async fn top_urls(
        &self,
        range: &TimeRange,
        limit: usize,
        sort: TopSort,
    ) -> Result<Vec<UrlTotals>> {
        let records = self.records.lock().await;
        let mut by_code: HashMap<&str, Vec<&ClickRecord>> = HashMap::new();
        for record in records.iter().filter(|r| Self::in_range(r, range)) {
            by_code
                .entry(record.short_code.as_str())
                .or_default()
                .push(record);
        }

        let mut totals: Vec<UrlTotals> = by_code
            .into_iter()
            .map(|(code, group)| Self::totals_of(code, &group))
            .collect();

        totals.sort_by(|a, b| {
            let ordering = match sort {
                TopSort::Clicks => b.total_clicks.cmp(&a.total_clicks),
                TopSort::UniqueClicks => b.unique_clicks.cmp(&a.unique_clicks),
                TopSort::CreatedAt => b.first_seen.cmp(&a.first_seen),
            };
            ordering.then_with(|| a.short_code.cmp(&b.short_code))
        });
        totals.truncate(limit);
        Ok(totals)
    }

    async fn dashboard_totals(&self, range: &TimeRange) -> Result<DashboardTotals> {
        let records = self.records.lock().await;
        let active_start = range.active_window_start();

        let mut codes: HashSet<&str> = HashSet::new();
        let mut sessions: HashSet<&str> = HashSet::new();
        let mut active_codes: HashSet<&str> = HashSet::new();
        let mut total_clicks = 0u64;

        for record in records.iter().filter(|r| Self::in_range(r, range)) {
            codes.insert(record.short_code.as_str());
            sessions.insert(record.session_id.as_str());
            total_clicks += 1;
            if record.occurred_at >= active_start {
                active_codes.insert(record.short_code.as_str());
            }
        }

        Ok(DashboardTotals {
            total_urls: codes.len() as u64,
            total_clicks,
            unique_clicks: sessions.len() as u64,
            active_urls: active_codes.len() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jiff::SignedDuration;

    fn record(code: &str, session: &str, at: Timestamp) -> ClickRecord {
        ClickRecord {
            short_code: ShortCode::new_unchecked(code),
            long_url: "https://example.com".to_string(),
            client_address: "203.0.113.7".to_string(),
            user_agent: "Mozilla/5.0".to_string(),
            referrer: String::new(),
            country: "Unknown".to_string(),
            city: "Unknown".to_string(),
            device_type: "desktop".to_string(),
            browser: "Chrome".to_string(),
            os: "Linux".to_string(),
            occurred_at: at,
            session_id: session.to_string(),
            is_unique: false,
            created_at: at,
        }
    }

    fn range_around(center: Timestamp) -> TimeRange {
        TimeRange::new(
            center - SignedDuration::from_hours(24),
            center + SignedDuration::from_hours(24),
        )
    }

    #[tokio::test]
    async fn totals_count_clicks_and_sessions() {
        let store = MemoryClickStore::new();
        let now = Timestamp::now();
        let code = ShortCode::new_unchecked("abc1234");

        store.append(&record("abc1234", "s1", now)).await.unwrap();
        store.append(&record("abc1234", "s1", now)).await.unwrap();
        store.append(&record("abc1234", "s2", now)).await.unwrap();
        store.append(&record("other00", "s9", now)).await.unwrap();

        let totals = store.totals(&code, &range_around(now)).await.unwrap();
        assert_eq!(totals.total_clicks, 3);
        assert_eq!(totals.unique_clicks, 2);
        assert_eq!(totals.last_clicked, Some(now));
    }

    #[tokio::test]
    async fn out_of_range_records_are_invisible() {
        let store = MemoryClickStore::new();
        let now = Timestamp::now();
        let code = ShortCode::new_unchecked("abc1234");

        store
            .append(&record("abc1234", "s1", now - SignedDuration::from_hours(48)))
            .await
            .unwrap();

        let totals = store.totals(&code, &range_around(now)).await.unwrap();
        assert_eq!(totals.total_clicks, 0);
        assert_eq!(totals.last_clicked, None);
    }

    #[tokio::test]
    async fn time_series_buckets_by_hour() {
        let store = MemoryClickStore::new();
        let base = Timestamp::from_second(1_700_000_000).unwrap();
        let code = ShortCode::new_unchecked("abc1234");

        store.append(&record("abc1234", "s1", base)).await.unwrap();
        store
            .append(&record("abc1234", "s2", base + SignedDuration::from_secs(60)))
            .await
            .unwrap();
        store
            .append(&record("abc1234", "s3", base + SignedDuration::from_hours(2)))
            .await
            .unwrap();

        let series = store
            .time_series(Some(&code), &range_around(base), Granularity::Hour)
            .await
            .unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].clicks, 2);
        assert_eq!(series[0].unique_clicks, 2);
        assert_eq!(series[1].clicks, 1);
        assert!(series[0].bucket < series[1].bucket);
    }

    #[tokio::test]
    async fn breakdown_collapses_empty_referrer_to_direct() {
        let store = MemoryClickStore::new();
        let now = Timestamp::now();
        let code = ShortCode::new_unchecked("abc1234");

        let mut with_ref = record("abc1234", "s1", now);
        with_ref.referrer = "https://news.example".to_string();
        store.append(&with_ref).await.unwrap();
        store.append(&record("abc1234", "s2", now)).await.unwrap();
        store.append(&record("abc1234", "s3", now)).await.unwrap();

        let breakdown = store
            .breakdown(Some(&code), Dimension::Referrer, &range_around(now), 10)
            .await
            .unwrap();
        assert_eq!(breakdown[0].value, "Direct");
        assert_eq!(breakdown[0].clicks, 2);
        assert!((breakdown[0].percentage - 66.66).abs() < 1.0);
        assert_eq!(breakdown[1].value, "https://news.example");
    }

    #[tokio::test]
    async fn breakdown_skips_empty_values_of_other_dimensions() {
        let store = MemoryClickStore::new();
        let now = Timestamp::now();
        let code = ShortCode::new_unchecked("abc1234");

        let mut no_country = record("abc1234", "s1", now);
        no_country.country = String::new();
        store.append(&no_country).await.unwrap();

        let mut with_country = record("abc1234", "s2", now);
        with_country.country = "DE".to_string();
        store.append(&with_country).await.unwrap();

        let breakdown = store
            .breakdown(Some(&code), Dimension::Country, &range_around(now), 10)
            .await
            .unwrap();
        assert_eq!(breakdown.len(), 1);
        assert_eq!(breakdown[0].value, "DE");
        assert_eq!(breakdown[0].percentage, 100.0);
    }

    #[tokio::test]
    async fn top_urls_orders_by_clicks() {
        let store = MemoryClickStore::new();
        let now = Timestamp::now();

        for i in 0..3 {
            store
                .append(&record("busy123", &format!("s{i}"), now))
                .await
                .unwrap();
        }
        store.append(&record("quiet12", "s9", now)).await.unwrap();

        let top = store
            .top_urls(&range_around(now), 10, TopSort::Clicks)
            .await
            .unwrap();
        assert_eq!(top[0].short_code, "busy123");
        assert_eq!(top[0].total_clicks, 3);
        assert_eq!(top[1].short_code, "quiet12");

        let top = store
            .top_urls(&range_around(now), 1, TopSort::Clicks)
            .await
            .unwrap();
        assert_eq!(top.len(), 1);
    }

    #[tokio::test]
    async fn dashboard_counts_active_urls_in_trailing_window() {
        let store = MemoryClickStore::new();
        let end = Timestamp::now();
        let start = end - SignedDuration::from_hours(30 * 24);
        let range = TimeRange::new(start, end);

        // Clicked 20 days before the range end: inside the range but
        // outside the 7-day active window.
        store
            .append(&record("old0000", "s1", end - SignedDuration::from_hours(20 * 24)))
            .await
            .unwrap();
        store
            .append(&record("new0000", "s2", end - SignedDuration::from_hours(24)))
            .await
            .unwrap();

        let totals = store.dashboard_totals(&range).await.unwrap();
        assert_eq!(totals.total_urls, 2);
        assert_eq!(totals.total_clicks, 2);
        assert_eq!(totals.active_urls, 1);
    }

    #[tokio::test]
    async fn session_probe_ignores_range() {
        let store = MemoryClickStore::new();
        let code = ShortCode::new_unchecked("abc1234");
        let long_ago = Timestamp::from_second(1_000_000_000).unwrap();

        store.append(&record("abc1234", "s1", long_ago)).await.unwrap();

        assert!(store.session_exists(&code, "s1").await.unwrap());
        assert!(!store.session_exists(&code, "s2").await.unwrap());
    }
}
