use crate::model::{
    ClickRecord, DashboardTotals, Dimension, DimensionCount, Granularity, TimeRange,
    TimeSeriesPoint, TopSort, UrlTotals,
};
use crate::store::ClickStore;
use async_trait::async_trait;
use clickhouse::Row;
use hoplink_core::{ShortCode, StorageError};
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

type Result<T> = std::result::Result<T, StorageError>;

/// ClickHouse-backed [`ClickStore`].
///
/// Records live in `click_records`, partitioned by calendar month of
/// `occurred_at` and ordered by `(short_code, occurred_at)`.
/// Timestamps are integer Unix seconds end to end.
#[derive(Clone)]
pub struct ClickHouseClickStore {
    client: clickhouse::Client,
}

impl std::fmt::Debug for ClickHouseClickStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClickHouseClickStore").finish_non_exhaustive()
    }
}

#[derive(Debug, Row, Serialize, Deserialize)]
struct ClickRow {
    short_code: String,
    long_url: String,
    client_address: String,
    user_agent: String,
    referrer: String,
    country: String,
    city: String,
    device_type: String,
    browser: String,
    os: String,
    occurred_at: i64,
    session_id: String,
    is_unique: bool,
    created_at: i64,
}

impl From<&ClickRecord> for ClickRow {
    fn from(record: &ClickRecord) -> Self {
        Self {
            short_code: record.short_code.to_string(),
            long_url: record.long_url.clone(),
            client_address: record.client_address.clone(),
            user_agent: record.user_agent.clone(),
            referrer: record.referrer.clone(),
            country: record.country.clone(),
            city: record.city.clone(),
            device_type: record.device_type.clone(),
            browser: record.browser.clone(),
            os: record.os.clone(),
            occurred_at: record.occurred_at.as_second(),
            session_id: record.session_id.clone(),
            is_unique: record.is_unique,
            created_at: record.created_at.as_second(),
        }
    }
}

#[derive(Debug, Row, Deserialize)]
struct TotalsRow {
    total_clicks: i64,
    unique_clicks: i64,
    last_clicked: i64,
    first_seen: i64,
}

#[derive(Debug, Row, Deserialize)]
struct BucketRow {
    bucket: i64,
    clicks: i64,
    unique_clicks: i64,
}

#[derive(Debug, Row, Deserialize)]
struct DimensionRow {
    value: String,
    clicks: i64,
    percentage: f64,
}

#[derive(Debug, Row, Deserialize)]
struct TopRow {
    short_code: String,
    total_clicks: i64,
    unique_clicks: i64,
    last_clicked: i64,
    first_seen: i64,
}

#[derive(Debug, Row, Deserialize)]
struct DashboardRow {
    total_urls: i64,
    total_clicks: i64,
    unique_clicks: i64,
    active_urls: i64,
}

#[derive(Debug, Row, Deserialize)]
struct CountRow {
    matches: u64,
}

fn map_clickhouse_error(err: clickhouse::error::Error) -> StorageError {
    let message = err.to_string();
    let lower = message.to_ascii_lowercase();
    if lower.contains("timed out") || lower.contains("timeout") {
        StorageError::Timeout(message)
    } else if lower.contains("connection") || lower.contains("network") || lower.contains("connect")
    {
        StorageError::Unavailable(message)
    } else {
        StorageError::Query(message)
    }
}

fn timestamp_or_none(seconds: i64, total_clicks: i64) -> Option<Timestamp> {
    // Aggregates over zero rows report zero; treat that as absent.
    if total_clicks == 0 {
        return None;
    }
    Timestamp::from_second(seconds).ok()
}

/// Wraps `occurred_at` into the ClickHouse expression producing the
/// bucket start as Unix seconds.
fn bucket_expr(granularity: Granularity) -> String {
    format!(
        "toInt64(toUnixTimestamp(toDateTime({}(toDateTime(occurred_at)))))",
        granularity.clickhouse_fn()
    )
}

impl ClickHouseClickStore {
    /// Wraps an existing client.
    pub fn new(client: clickhouse::Client) -> Self {
        Self { client }
    }

    /// Builds a client for the given endpoint and database.
    pub fn connect(columnar_url: &str, database: &str) -> Self {
        let client = clickhouse::Client::default()
            .with_url(columnar_url)
            .with_database(database);
        Self::new(client)
    }

    /// Creates the table and the optional rollup views. View creation
    /// failures are logged and non-fatal.
    pub async fn ensure_schema(&self) -> Result<()> {
        self.client
            .query(include_str!("../ddl/clickhouse/click_records.sql"))
            .execute()
            .await
            .map_err(map_clickhouse_error)?;

        for (name, ddl) in [
            ("hourly", HOURLY_ROLLUP_DDL),
            ("daily", DAILY_ROLLUP_DDL),
        ] {
            if let Err(e) = self.client.query(ddl).execute().await {
                warn!(rollup = name, error = %e, "failed to create rollup view");
            }
        }

        debug!("click_records schema is in place");
        Ok(())
    }

    pub fn client(&self) -> &clickhouse::Client {
        &self.client
    }
}

const HOURLY_ROLLUP_DDL: &str = r#"
CREATE MATERIALIZED VIEW IF NOT EXISTS click_records_hourly_mv
ENGINE = SummingMergeTree()
PARTITION BY toYYYYMM(hour)
ORDER BY (short_code, hour)
AS SELECT
    short_code,
    toStartOfHour(toDateTime(occurred_at)) AS hour,
    count() AS total_clicks,
    uniq(session_id) AS unique_visitors
FROM click_records
GROUP BY short_code, hour
"#;

const DAILY_ROLLUP_DDL: &str = r#"
CREATE MATERIALIZED VIEW IF NOT EXISTS click_records_daily_mv
ENGINE = SummingMergeTree()
PARTITION BY toYYYYMM(day)
ORDER BY (short_code, day)
AS SELECT
    short_code,
    toStartOfDay(toDateTime(occurred_at)) AS day,
    count() AS total_clicks,
    uniq(session_id) AS unique_visitors,
    uniq(country) AS countries
FROM click_records
GROUP BY short_code, day
"#;

#[async_trait]
impl ClickStore for ClickHouseClickStore {
    async fn append(&self, record: &ClickRecord) -> Result<()> {
        let mut insert = self
            .client
            .insert("click_records")
            .map_err(map_clickhouse_error)?;
        insert
            .write(&ClickRow::from(record))
            .await
            .map_err(map_clickhouse_error)?;
        insert.end().await.map_err(map_clickhouse_error)?;
        Ok(())
    }

    async fn session_exists(&self, code: &ShortCode, session_id: &str) -> Result<bool> {
        let row: CountRow = self
            .client
            .query(
                "SELECT count() AS matches FROM click_records \
                 WHERE short_code = ? AND session_id = ?",
            )
            .bind(code.as_str())
            .bind(session_id)
            .fetch_one()
            .await
            .map_err(map_clickhouse_error)?;
        Ok(row.matches > 0)
    }

    async fn totals(&self, code: &ShortCode, range: &TimeRange) -> Result<UrlTotals> {
        let row: TotalsRow = self
            .client
            .query(
                "SELECT \
                     toInt64(count()) AS total_clicks, \
                     toInt64(uniq(session_id)) AS unique_clicks, \
                     toInt64(max(occurred_at)) AS last_clicked, \
                     toInt64(min(occurred_at)) AS first_seen \
                 FROM click_records \
                 WHERE short_code = ? AND occurred_at BETWEEN ? AND ?",
            )
            .bind(code.as_str())
            .bind(range.start.as_second())
            .bind(range.end.as_second())
            .fetch_one()
            .await
            .map_err(map_clickhouse_error)?;

        Ok(UrlTotals {
            short_code: code.to_string(),
            total_clicks: row.total_clicks.max(0) as u64,
            unique_clicks: row.unique_clicks.max(0) as u64,
            last_clicked: timestamp_or_none(row.last_clicked, row.total_clicks),
            first_seen: timestamp_or_none(row.first_seen, row.total_clicks),
        })
    }

    async fn time_series(
        &self,
        code: Option<&ShortCode>,
        range: &TimeRange,
        granularity: Granularity,
    ) -> Result<Vec<TimeSeriesPoint>> {
        let bucket = bucket_expr(granularity);
        let rows: Vec<BucketRow> = match code {
            Some(code) => {
                self.client
                    .query(&format!(
                        "SELECT {bucket} AS bucket, \
                             toInt64(count()) AS clicks, \
                             toInt64(uniq(session_id)) AS unique_clicks \
                         FROM click_records \
                         WHERE short_code = ? AND occurred_at BETWEEN ? AND ? \
                         GROUP BY bucket ORDER BY bucket"
                    ))
                    .bind(code.as_str())
                    .bind(range.start.as_second())
                    .bind(range.end.as_second())
                    .fetch_all()
                    .await
            }
            None => {
                self.client
                    .query(&format!(
                        "SELECT {bucket} AS bucket, \
                             toInt64(count()) AS clicks, \
                             toInt64(uniq(session_id)) AS unique_clicks \
                         FROM click_records \
                         WHERE occurred_at BETWEEN ? AND ? \
                         GROUP BY bucket ORDER BY bucket"
                    ))
                    .bind(range.start.as_second())
                    .bind(range.end.as_second())
                    .fetch_all()
                    .await
            }
        }
        .map_err(map_clickhouse_error)?;

        Ok(rows
            .into_iter()
            .map(|row| TimeSeriesPoint {
                bucket: row.bucket,
                clicks: row.clicks.max(0) as u64,
                unique_clicks: row.unique_clicks.max(0) as u64,
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
        // Empty referrers collapse into 'Direct'; other dimensions
        // drop empty values.
        let (value_expr, value_filter) = match dimension {
            Dimension::Referrer => (
                "CASE WHEN referrer = '' THEN 'Direct' ELSE referrer END".to_string(),
                String::new(),
            ),
            other => {
                let column = other.column();
                (column.to_string(), format!(" AND {column} != ''"))
            }
        };
        let code_filter = if code.is_some() {
            " AND short_code = ?"
        } else {
            ""
        };

        let sql = format!(
            "SELECT {value_expr} AS value, \
                 toInt64(count()) AS clicks, \
                 toFloat64(count() * 100.0 / sum(count()) OVER ()) AS percentage \
             FROM click_records \
             WHERE occurred_at BETWEEN ? AND ?{code_filter}{value_filter} \
             GROUP BY value ORDER BY clicks DESC, value ASC LIMIT ?"
        );

        let mut query = self
            .client
            .query(&sql)
            .bind(range.start.as_second())
            .bind(range.end.as_second());
        if let Some(code) = code {
            query = query.bind(code.as_str());
        }

        let rows: Vec<DimensionRow> = query
            .bind(limit as u64)
            .fetch_all()
            .await
            .map_err(map_clickhouse_error)?;

        Ok(rows
            .into_iter()
            .map(|row| DimensionCount {
                value: row.value,
                clicks: row.clicks.max(0) as u64,
                percentage: row.percentage,
            })
            .collect())
    }

    async fn top_urls(
        &self,
        range: &TimeRange,
        limit: usize,
        sort: TopSort,
    ) -> Result<Vec<UrlTotals>> {
        let order = match sort {
            TopSort::Clicks => "total_clicks DESC",
            TopSort::UniqueClicks => "unique_clicks DESC",
            TopSort::CreatedAt => "first_seen DESC",
        };

        let rows: Vec<TopRow> = self
            .client
            .query(&format!(
                "SELECT short_code, \
                     toInt64(count()) AS total_clicks, \
                     toInt64(uniq(session_id)) AS unique_clicks, \
                     toInt64(max(occurred_at)) AS last_clicked, \
                     toInt64(min(occurred_at)) AS first_seen \
                 FROM click_records \
                 WHERE occurred_at BETWEEN ? AND ? \
                 GROUP BY short_code \
                 ORDER BY {order}, short_code ASC \
                 LIMIT ?"
            ))
            .bind(range.start.as_second())
            .bind(range.end.as_second())
            .bind(limit as u64)
            .fetch_all()
            .await
            .map_err(map_clickhouse_error)?;

        Ok(rows
            .into_iter()
            .map(|row| UrlTotals {
                short_code: row.short_code,
                total_clicks: row.total_clicks.max(0) as u64,
                unique_clicks: row.unique_clicks.max(0) as u64,
                last_clicked: timestamp_or_none(row.last_clicked, row.total_clicks),
                first_seen: timestamp_or_none(row.first_seen, row.total_clicks),
            })
            .collect())
    }

    async fn dashboard_totals(&self, range: &TimeRange) -> Result<DashboardTotals> {
        let row: DashboardRow = self
            .client
            .query(
                "SELECT \
                     toInt64(uniq(short_code)) AS total_urls, \
                     toInt64(count()) AS total_clicks, \
                     toInt64(uniq(session_id)) AS unique_clicks, \
                     toInt64(uniqIf(short_code, occurred_at >= ?)) AS active_urls \
                 FROM click_records \
                 WHERE occurred_at BETWEEN ? AND ?",
            )
            .bind(range.active_window_start().as_second())
            .bind(range.start.as_second())
            .bind(range.end.as_second())
            .fetch_one()
            .await
            .map_err(map_clickhouse_error)?;

        Ok(DashboardTotals {
            total_urls: row.total_urls.max(0) as u64,
            total_clicks: row.total_clicks.max(0) as u64,
            unique_clicks: row.unique_clicks.max(0) as u64,
            active_urls: row.active_urls.max(0) as u64,
        })
    }
}
