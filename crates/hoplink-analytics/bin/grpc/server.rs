use crate::error::to_status;
use hoplink_analytics::{
    AnalyticsService, ClickIngester, ClickStore, Dashboard, DimensionCount, Granularity,
    IngestError, TimeRange, TimeSeriesPoint, TopSort, UrlStatsReport,
};
use hoplink_core::{ClickEvent, SharedCache};
use hoplink_proto::analytics::v1 as proto;
use hoplink_proto::analytics::v1::analytics_service_server::AnalyticsService as AnalyticsRpc;
use jiff::Timestamp;
use std::sync::Arc;
use tonic::{Request, Response, Status};

pub struct AnalyticsGrpcServer<S, C> {
    query: AnalyticsService<S>,
    ingester: Arc<ClickIngester<S, C>>,
    service_name: String,
    service_version: String,
}

impl<S, C> AnalyticsGrpcServer<S, C>
where
    S: ClickStore,
    C: SharedCache,
{
    pub fn new(
        query: AnalyticsService<S>,
        ingester: Arc<ClickIngester<S, C>>,
        service_name: String,
        service_version: String,
    ) -> Self {
        Self {
            query,
            ingester,
            service_name,
            service_version,
        }
    }
}

fn series_to_proto(points: Vec<TimeSeriesPoint>) -> Vec<proto::TimeSeriesPoint> {
    points
        .into_iter()
        .map(|p| proto::TimeSeriesPoint {
            bucket: p.bucket,
            clicks: p.clicks as i64,
            unique_clicks: p.unique_clicks as i64,
        })
        .collect()
}

fn breakdown_to_proto(rows: Vec<DimensionCount>) -> Vec<proto::DimensionCount> {
    rows.into_iter()
        .map(|d| proto::DimensionCount {
            value: d.value,
            clicks: d.clicks as i64,
            percentage: d.percentage,
        })
        .collect()
}

fn stats_to_proto(report: UrlStatsReport) -> proto::UrlStatsResponse {
    proto::UrlStatsResponse {
        short_code: report.totals.short_code,
        total_clicks: report.totals.total_clicks as i64,
        unique_clicks: report.totals.unique_clicks as i64,
        last_clicked: report.totals.last_clicked.map(|ts| ts.as_second()),
        time_series: series_to_proto(report.time_series),
        countries: breakdown_to_proto(report.countries),
        devices: breakdown_to_proto(report.devices),
        browsers: breakdown_to_proto(report.browsers),
        referrers: breakdown_to_proto(report.referrers),
    }
}

fn dashboard_to_proto(dashboard: Dashboard) -> proto::DashboardResponse {
    proto::DashboardResponse {
        total_urls: dashboard.totals.total_urls as i64,
        total_clicks: dashboard.totals.total_clicks as i64,
        unique_clicks: dashboard.totals.unique_clicks as i64,
        active_urls: dashboard.totals.active_urls as i64,
        click_timeline: series_to_proto(dashboard.click_timeline),
        top_countries: breakdown_to_proto(dashboard.top_countries),
        device_breakdown: breakdown_to_proto(dashboard.device_breakdown),
    }
}

#[tonic::async_trait]
impl<S, C> AnalyticsRpc for AnalyticsGrpcServer<S, C>
where
    S: ClickStore,
    C: SharedCache,
{
    async fn process_click(
        &self,
        request: Request<proto::ProcessClickRequest>,
    ) -> Result<Response<proto::ProcessClickResponse>, Status> {
        let message = request
            .into_inner()
            .event
            .ok_or_else(|| Status::invalid_argument("event is required"))?;

        let event: ClickEvent = message
            .try_into()
            .map_err(|e| Status::invalid_argument(format!("invalid click event: {e}")))?;

        let record = self.ingester.process_event(event).await.map_err(|e| match e {
            IngestError::Decode(e) => Status::invalid_argument(e.to_string()),
            IngestError::Store(e) => Status::unavailable(e.to_string()),
        })?;

        Ok(Response::new(proto::ProcessClickResponse {
            accepted: true,
            is_unique: record.is_unique,
        }))
    }

    async fn get_url_stats(
        &self,
        request: Request<proto::UrlStatsRequest>,
    ) -> Result<Response<proto::UrlStatsResponse>, Status> {
        let request = request.into_inner();

        let range =
            TimeRange::from_wire(request.start_time, request.end_time).map_err(to_status)?;
        let granularity = Granularity::parse(&request.granularity).map_err(to_status)?;

        let report = self
            .query
            .url_stats(&request.short_code, range, granularity)
            .await
            .map_err(to_status)?;

        Ok(Response::new(stats_to_proto(report)))
    }

    async fn get_top_urls(
        &self,
        request: Request<proto::TopUrlsRequest>,
    ) -> Result<Response<proto::TopUrlsResponse>, Status> {
        let request = request.into_inner();

        let range =
            TimeRange::from_wire(request.start_time, request.end_time).map_err(to_status)?;
        let sort = TopSort::parse(&request.sort_by).map_err(to_status)?;

        let totals = self
            .query
            .top_urls(request.limit, range, sort)
            .await
            .map_err(to_status)?;

        Ok(Response::new(proto::TopUrlsResponse {
            urls: totals
                .into_iter()
                .map(|t| proto::UrlTotals {
                    short_code: t.short_code,
                    total_clicks: t.total_clicks as i64,
                    unique_clicks: t.unique_clicks as i64,
                    last_clicked: t.last_clicked.map(|ts| ts.as_second()),
                    first_seen: t.first_seen.map(|ts| ts.as_second()),
                })
                .collect(),
        }))
    }

    async fn get_dashboard(
        &self,
        request: Request<proto::DashboardRequest>,
    ) -> Result<Response<proto::DashboardResponse>, Status> {
        let request = request.into_inner();

        let range =
            TimeRange::from_wire(request.start_time, request.end_time).map_err(to_status)?;

        let dashboard = self.query.dashboard(range).await.map_err(to_status)?;
        Ok(Response::new(dashboard_to_proto(dashboard)))
    }

    async fn health(
        &self,
        _request: Request<proto::HealthRequest>,
    ) -> Result<Response<proto::HealthResponse>, Status> {
        Ok(Response::new(proto::HealthResponse {
            status: "ok".to_string(),
            service: self.service_name.clone(),
            version: self.service_version.clone(),
            timestamp: Timestamp::now().as_second(),
        }))
    }
}
