use crate::error::Result;
use crate::model::{
    DashboardParams, DashboardResponse, StatsParams, TopUrlsParams, TopUrlsResponse,
    UrlStatsResponse,
};
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::Json;
use hoplink_proto::analytics::v1 as proto;

pub async fn url_stats_handler(
    Path(code): Path<String>,
    Query(params): Query<StatsParams>,
    State(state): State<AppState>,
) -> Result<Json<UrlStatsResponse>> {
    let mut client = state.analytics.clone();

    let response = client
        .get_url_stats(proto::UrlStatsRequest {
            short_code: code,
            start_time: params.start_time,
            end_time: params.end_time,
            granularity: params.granularity,
        })
        .await?
        .into_inner();

    Ok(Json(response.into()))
}

pub async fn top_urls_handler(
    Query(params): Query<TopUrlsParams>,
    State(state): State<AppState>,
) -> Result<Json<TopUrlsResponse>> {
    let mut client = state.analytics.clone();

    let response = client
        .get_top_urls(proto::TopUrlsRequest {
            limit: params.limit,
            start_time: params.start_time,
            end_time: params.end_time,
            sort_by: params.sort_by,
        })
        .await?
        .into_inner();

    Ok(Json(response.into()))
}

pub async fn dashboard_handler(
    Query(params): Query<DashboardParams>,
    State(state): State<AppState>,
) -> Result<Json<DashboardResponse>> {
    let mut client = state.analytics.clone();

    let response = client
        .get_dashboard(proto::DashboardRequest {
            start_time: params.start_time,
            end_time: params.end_time,
        })
        .await?
        .into_inner();

    Ok(Json(response.into()))
}
