use crate::error::Result;
use crate::model::RedirectInfo;
use crate::state::AppState;
use axum::extract::{ConnectInfo, Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use hoplink_proto::resolver::v1 as proto;
use serde_json::json;
use std::net::SocketAddr;

fn header_str<'a>(headers: &'a HeaderMap, name: header::HeaderName) -> &'a str {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("")
}

/// The client address as the resolver should see it: the first hop of
/// `X-Forwarded-For` when a proxy added one, the socket peer
/// otherwise.
fn client_address(headers: &HeaderMap, peer: SocketAddr) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|value| value.trim().to_string())
        .unwrap_or_else(|| peer.ip().to_string())
}

fn wants_json(headers: &HeaderMap) -> bool {
    header_str(headers, header::ACCEPT).contains("application/json")
}

pub async fn resolve_handler(
    Path(code): Path<String>,
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Result<Response> {
    let mut client = state.resolver.clone();

    let response = client
        .resolve(proto::ResolveRequest {
            short_code: code.clone(),
            client_address: client_address(&headers, peer),
            user_agent: header_str(&headers, header::USER_AGENT).to_string(),
            referrer: header_str(&headers, header::REFERER).to_string(),
        })
        .await?
        .into_inner();

    if !response.found {
        return Ok((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "short URL not found" })),
        )
            .into_response());
    }

    if response.expired {
        return Ok((
            StatusCode::GONE,
            Json(json!({ "error": "short URL has expired" })),
        )
            .into_response());
    }

    if wants_json(&headers) {
        return Ok(Json(RedirectInfo {
            short_code: code,
            long_url: response.long_url,
            click_count: response.click_count,
        })
        .into_response());
    }

    // 302 Found, as redirect clients expect from a shortener.
    Ok((
        StatusCode::FOUND,
        [(header::LOCATION, response.long_url)],
    )
        .into_response())
}
