use crate::error::Result;
use crate::model::{
    ListParams, OwnerParam, ShortenRequest, ShortenResponse, UrlInfo, UserUrlsResponse,
};
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use hoplink_proto::shortener::v1 as proto;
use tonic::Status;

pub async fn shorten_handler(
    State(state): State<AppState>,
    Json(request): Json<ShortenRequest>,
) -> Result<(StatusCode, Json<ShortenResponse>)> {
    let mut client = state.shortener.clone();

    let response = client
        .shorten(proto::ShortenRequest {
            long_url: request.long_url,
            owner_id: request.user_id,
            custom_alias: request.custom_alias,
            expires_at: request.expires_at,
            metadata: request.metadata.into_iter().collect(),
        })
        .await?
        .into_inner();

    let short_url = format!(
        "{}/{}",
        state.base_url.trim_end_matches('/'),
        response.short_code
    );

    Ok((
        StatusCode::CREATED,
        Json(ShortenResponse {
            short_code: response.short_code,
            short_url,
            created_at: response.created_at,
            expires_at: response.expires_at,
        }),
    ))
}

pub async fn get_url_handler(
    Path(code): Path<String>,
    Query(owner): Query<OwnerParam>,
    State(state): State<AppState>,
) -> Result<Json<UrlInfo>> {
    let mut client = state.shortener.clone();

    let response = client
        .get_info(proto::GetInfoRequest {
            short_code: code,
            owner_id: owner.user_id,
        })
        .await?
        .into_inner();

    let mapping = response
        .mapping
        .ok_or_else(|| Status::internal("missing mapping in response"))?;
    Ok(Json(mapping.into()))
}

pub async fn delete_url_handler(
    Path(code): Path<String>,
    Query(owner): Query<OwnerParam>,
    State(state): State<AppState>,
) -> Result<StatusCode> {
    if owner.user_id.is_empty() {
        return Err(Status::invalid_argument("user_id is required").into());
    }

    let mut client = state.shortener.clone();
    client
        .delete(proto::DeleteRequest {
            short_code: code,
            owner_id: owner.user_id,
        })
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_user_urls_handler(
    Path(user_id): Path<String>,
    Query(params): Query<ListParams>,
    State(state): State<AppState>,
) -> Result<Json<UserUrlsResponse>> {
    let mut client = state.shortener.clone();

    let response = client
        .list_by_owner(proto::ListByOwnerRequest {
            owner_id: user_id,
            page: params.page,
            page_size: params.page_size,
            sort_by: params.sort_by,
            sort_order: params.sort_order,
        })
        .await?
        .into_inner();

    Ok(Json(UserUrlsResponse {
        urls: response.mappings.into_iter().map(Into::into).collect(),
        page: response.page,
        page_size: response.page_size,
        has_next: response.has_next,
    }))
}
