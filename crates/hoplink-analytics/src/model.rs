use hoplink_core::{Error, ShortCode};
use jiff::civil;
use jiff::tz::TimeZone;
use jiff::{SignedDuration, Timestamp};

/// One persisted, enriched click. Appended to the columnar store,
/// partitioned by calendar month of `occurred_at` and ordered by
/// `(short_code, occurred_at)`.
#[derive(Debug, Clone, PartialEq)]
pub struct ClickRecord {
    pub short_code: ShortCode,
    pub long_url: String,
    pub client_address: String,
    pub user_agent: String,
    pub referrer: String,
    pub country: String,
    pub city: String,
    pub device_type: String,
    pub browser: String,
    pub os: String,
    pub occurred_at: Timestamp,
    pub session_id: String,
    pub is_unique: bool,
    pub created_at: Timestamp,
}

/// Time-series bucket width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Granularity {
    Hour,
    #[default]
    Day,
    Week,
    Month,
}

const SECONDS_PER_HOUR: i64 = 3600;
const SECONDS_PER_DAY: i64 = 86_400;

impl Granularity {
    /// Parses the wire value; empty selects the default.
    pub fn parse(value: &str) -> Result<Self, Error> {
        match value {
            "hour" => Ok(Self::Hour),
            "" | "day" => Ok(Self::Day),
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            other => Err(Error::InvalidInput(format!(
                "granularity must be one of hour, day, week, month; got '{other}'"
            ))),
        }
    }

    /// Start of the bucket containing `seconds`, as Unix seconds.
    /// Weeks start on Sunday; months are calendar months in UTC.
    pub fn bucket_start(self, seconds: i64) -> i64 {
        match self {
            Self::Hour => seconds - seconds.rem_euclid(SECONDS_PER_HOUR),
            Self::Day => seconds - seconds.rem_euclid(SECONDS_PER_DAY),
            Self::Week => {
                let day_index = seconds.div_euclid(SECONDS_PER_DAY);
                // 1970-01-01 was a Thursday; shift so Sunday is zero.
                let weekday = (day_index + 4).rem_euclid(7);
                (day_index - weekday) * SECONDS_PER_DAY
            }
            Self::Month => {
                let Ok(ts) = Timestamp::from_second(seconds) else {
                    return seconds - seconds.rem_euclid(SECONDS_PER_DAY);
                };
                let date = ts.to_zoned(TimeZone::UTC).date();
                civil::date(date.year(), date.month(), 1)
                    .to_zoned(TimeZone::UTC)
                    .map(|z| z.timestamp().as_second())
                    .unwrap_or(seconds - seconds.rem_euclid(SECONDS_PER_DAY))
            }
        }
    }

    /// The ClickHouse bucket function for this width.
    pub fn clickhouse_fn(self) -> &'static str {
        match self {
            Self::Hour => "toStartOfHour",
            Self::Day => "toStartOfDay",
            Self::Week => "toStartOfWeek",
            Self::Month => "toStartOfMonth",
        }
    }
}

/// Inclusive query range. Unset bounds default to the last 30 days.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeRange {
    pub start: Timestamp,
    pub end: Timestamp,
}

const DEFAULT_RANGE: SignedDuration = SignedDuration::from_hours(30 * 24);

impl TimeRange {
    pub fn new(start: Timestamp, end: Timestamp) -> Self {
        Self { start, end }
    }

    /// Builds a range from wire values where `0` means "not provided".
    pub fn from_wire(start_time: i64, end_time: i64) -> Result<Self, Error> {
        let now = Timestamp::now();
        let end = if end_time > 0 {
            Timestamp::from_second(end_time)
                .map_err(|e| Error::InvalidInput(format!("invalid end_time '{end_time}': {e}")))?
        } else {
            now
        };
        let start = if start_time > 0 {
            Timestamp::from_second(start_time).map_err(|e| {
                Error::InvalidInput(format!("invalid start_time '{start_time}': {e}"))
            })?
        } else {
            now - DEFAULT_RANGE
        };
        Ok(Self { start, end })
    }

    /// Empty ranges produce zeros and empty arrays, never an error.
    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }

    pub fn contains(&self, ts: Timestamp) -> bool {
        self.start <= ts && ts <= self.end
    }

    /// The trailing window used for the dashboard's active-URL count:
    /// the last 7 days of the range.
    pub fn active_window_start(&self) -> Timestamp {
        self.end - SignedDuration::from_hours(7 * 24)
    }
}

/// Ordered totals for one short code.
#[derive(Debug, Clone, PartialEq)]
pub struct UrlTotals {
    pub short_code: String,
    pub total_clicks: u64,
    pub unique_clicks: u64,
    pub last_clicked: Option<Timestamp>,
    pub first_seen: Option<Timestamp>,
}

impl UrlTotals {
    pub fn empty(short_code: &str) -> Self {
        Self {
            short_code: short_code.to_string(),
            total_clicks: 0,
            unique_clicks: 0,
            last_clicked: None,
            first_seen: None,
        }
    }
}

/// One bucket of the click time series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeSeriesPoint {
    /// Start of the bucket, Unix seconds.
    pub bucket: i64,
    pub clicks: u64,
    pub unique_clicks: u64,
}

/// One value of a breakdown dimension with its share of the range.
#[derive(Debug, Clone, PartialEq)]
pub struct DimensionCount {
    pub value: String,
    pub clicks: u64,
    pub percentage: f64,
}

/// Breakdown dimensions served by the stats queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Country,
    Device,
    Browser,
    Referrer,
}

impl Dimension {
    pub fn column(self) -> &'static str {
        match self {
            Self::Country => "country",
            Self::Device => "device_type",
            Self::Browser => "browser",
            Self::Referrer => "referrer",
        }
    }
}

/// Sort key for the top-URLs query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TopSort {
    #[default]
    Clicks,
    UniqueClicks,
    CreatedAt,
}

impl TopSort {
    pub fn parse(value: &str) -> Result<Self, Error> {
        match value {
            "" | "clicks" => Ok(Self::Clicks),
            "unique_clicks" => Ok(Self::UniqueClicks),
            "created_at" => Ok(Self::CreatedAt),
            other => Err(Error::InvalidInput(format!(
                "sort_by must be one of clicks, unique_clicks, created_at; got '{other}'"
            ))),
        }
    }
}

/// Full per-URL statistics report.
#[derive(Debug, Clone, PartialEq)]
pub struct UrlStatsReport {
    pub totals: UrlTotals,
    pub time_series: Vec<TimeSeriesPoint>,
    pub countries: Vec<DimensionCount>,
    pub devices: Vec<DimensionCount>,
    pub browsers: Vec<DimensionCount>,
    pub referrers: Vec<DimensionCount>,
}

impl UrlStatsReport {
    pub fn empty(short_code: &str) -> Self {
        Self {
            totals: UrlTotals::empty(short_code),
            time_series: Vec::new(),
            countries: Vec::new(),
            devices: Vec::new(),
            browsers: Vec::new(),
            referrers: Vec::new(),
        }
    }
}

/// Scalar totals behind the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DashboardTotals {
    /// Distinct short codes observed in the range.
    pub total_urls: u64,
    pub total_clicks: u64,
    pub unique_clicks: u64,
    /// Distinct short codes observed in the last 7 days of the range.
    pub active_urls: u64,
}

/// The dashboard aggregate.
#[derive(Debug, Clone, PartialEq)]
pub struct Dashboard {
    pub totals: DashboardTotals,
    pub click_timeline: Vec<TimeSeriesPoint>,
    pub top_countries: Vec<DimensionCount>,
    pub device_breakdown: Vec<DimensionCount>,
}

impl Dashboard {
    pub fn empty() -> Self {
        Self {
            totals: DashboardTotals::default(),
            click_timeline: Vec::new(),
            top_countries: Vec::new(),
            device_breakdown: Vec::new(),
        }
    }
}
