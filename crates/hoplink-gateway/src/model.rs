use hoplink_proto::analytics::v1 as analytics_proto;
use hoplink_proto::shortener::v1 as shortener_proto;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// Timestamps cross this boundary as integer Unix seconds.

#[derive(Debug, Deserialize)]
pub struct ShortenRequest {
    pub long_url: String,
    pub user_id: String,
    #[serde(default)]
    pub custom_alias: Option<String>,
    #[serde(default)]
    pub expires_at: Option<i64>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
pub struct ShortenResponse {
    pub short_code: String,
    pub short_url: String,
    pub created_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct UrlInfo {
    pub short_code: String,
    pub long_url: String,
    pub owner_id: String,
    pub created_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    pub click_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_accessed: Option<i64>,
    pub active: bool,
    pub metadata: BTreeMap<String, String>,
}

impl From<shortener_proto::UrlMapping> for UrlInfo {
    fn from(mapping: shortener_proto::UrlMapping) -> Self {
        Self {
            short_code: mapping.short_code,
            long_url: mapping.long_url,
            owner_id: mapping.owner_id,
            created_at: mapping.created_at,
            expires_at: mapping.expires_at,
            click_count: mapping.click_count,
            last_accessed: mapping.last_accessed,
            active: mapping.active,
            metadata: mapping.metadata.into_iter().collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct OwnerParam {
    #[serde(default)]
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub page_size: u32,
    #[serde(default)]
    pub sort_by: String,
    #[serde(default)]
    pub sort_order: String,
}

#[derive(Debug, Serialize)]
pub struct UserUrlsResponse {
    pub urls: Vec<UrlInfo>,
    pub page: u32,
    pub page_size: u32,
    pub has_next: bool,
}

#[derive(Debug, Deserialize)]
pub struct StatsParams {
    #[serde(default)]
    pub start_time: i64,
    #[serde(default)]
    pub end_time: i64,
    #[serde(default)]
    pub granularity: String,
}

#[derive(Debug, Deserialize)]
pub struct TopUrlsParams {
    #[serde(default)]
    pub limit: u32,
    #[serde(default)]
    pub start_time: i64,
    #[serde(default)]
    pub end_time: i64,
    #[serde(default)]
    pub sort_by: String,
}

#[derive(Debug, Deserialize)]
pub struct DashboardParams {
    #[serde(default)]
    pub start_time: i64,
    #[serde(default)]
    pub end_time: i64,
}

#[derive(Debug, Serialize)]
pub struct TimeSeriesPoint {
    pub bucket: i64,
    pub clicks: i64,
    pub unique_clicks: i64,
}

impl From<analytics_proto::TimeSeriesPoint> for TimeSeriesPoint {
    fn from(point: analytics_proto::TimeSeriesPoint) -> Self {
        Self {
            bucket: point.bucket,
            clicks: point.clicks,
            unique_clicks: point.unique_clicks,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DimensionCount {
    pub value: String,
    pub clicks: i64,
    pub percentage: f64,
}

impl From<analytics_proto::DimensionCount> for DimensionCount {
    fn from(row: analytics_proto::DimensionCount) -> Self {
        Self {
            value: row.value,
            clicks: row.clicks,
            percentage: row.percentage,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UrlStatsResponse {
    pub short_code: String,
    pub total_clicks: i64,
    pub unique_clicks: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_clicked: Option<i64>,
    pub time_series: Vec<TimeSeriesPoint>,
    pub countries: Vec<DimensionCount>,
    pub devices: Vec<DimensionCount>,
    pub browsers: Vec<DimensionCount>,
    pub referrers: Vec<DimensionCount>,
}

impl From<analytics_proto::UrlStatsResponse> for UrlStatsResponse {
    fn from(stats: analytics_proto::UrlStatsResponse) -> Self {
        Self {
            short_code: stats.short_code,
            total_clicks: stats.total_clicks,
            unique_clicks: stats.unique_clicks,
            last_clicked: stats.last_clicked,
            time_series: stats.time_series.into_iter().map(Into::into).collect(),
            countries: stats.countries.into_iter().map(Into::into).collect(),
            devices: stats.devices.into_iter().map(Into::into).collect(),
            browsers: stats.browsers.into_iter().map(Into::into).collect(),
            referrers: stats.referrers.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UrlTotals {
    pub short_code: String,
    pub total_clicks: i64,
    pub unique_clicks: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_clicked: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_seen: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct TopUrlsResponse {
    pub urls: Vec<UrlTotals>,
}

impl From<analytics_proto::TopUrlsResponse> for TopUrlsResponse {
    fn from(response: analytics_proto::TopUrlsResponse) -> Self {
        Self {
            urls: response
                .urls
                .into_iter()
                .map(|u| UrlTotals {
                    short_code: u.short_code,
                    total_clicks: u.total_clicks,
                    unique_clicks: u.unique_clicks,
                    last_clicked: u.last_clicked,
                    first_seen: u.first_seen,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub total_urls: i64,
    pub total_clicks: i64,
    pub unique_clicks: i64,
    pub active_urls: i64,
    pub click_timeline: Vec<TimeSeriesPoint>,
    pub top_countries: Vec<DimensionCount>,
    pub device_breakdown: Vec<DimensionCount>,
}

impl From<analytics_proto::DashboardResponse> for DashboardResponse {
    fn from(dashboard: analytics_proto::DashboardResponse) -> Self {
        Self {
            total_urls: dashboard.total_urls,
            total_clicks: dashboard.total_clicks,
            unique_clicks: dashboard.unique_clicks,
            active_urls: dashboard.active_urls,
            click_timeline: dashboard.click_timeline.into_iter().map(Into::into).collect(),
            top_countries: dashboard.top_countries.into_iter().map(Into::into).collect(),
            device_breakdown: dashboard
                .device_breakdown
                .into_iter()
                .map(Into::into)
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RedirectInfo {
    pub short_code: String,
    pub long_url: String,
    pub click_count: i64,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: String,
    pub version: String,
    pub timestamp: i64,
}
