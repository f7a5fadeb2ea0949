use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tonic::Code;

pub type Result<T> = std::result::Result<T, ApiError>;

/// Error surface of the HTTP facade: a gRPC status translated into
/// the public status-code contract.
#[derive(Debug)]
pub struct ApiError(pub tonic::Status);

impl From<tonic::Status> for ApiError {
    fn from(status: tonic::Status) -> Self {
        Self(status)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // 410 Gone is not produced here: expiry is not an error on the
        // wire, it arrives as the `expired` flag of a successful
        // resolve and is mapped in the redirect handler.
        let status = match self.0.code() {
            Code::InvalidArgument => StatusCode::BAD_REQUEST,
            Code::PermissionDenied => StatusCode::FORBIDDEN,
            Code::NotFound => StatusCode::NOT_FOUND,
            Code::AlreadyExists => StatusCode::CONFLICT,
            Code::Unavailable | Code::DeadlineExceeded => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({ "error": self.0.message() }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_for(code: Code) -> StatusCode {
        ApiError(tonic::Status::new(code, "x"))
            .into_response()
            .status()
    }

    #[test]
    fn grpc_codes_map_to_public_statuses() {
        assert_eq!(status_for(Code::InvalidArgument), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(Code::PermissionDenied), StatusCode::FORBIDDEN);
        assert_eq!(status_for(Code::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(status_for(Code::AlreadyExists), StatusCode::CONFLICT);
        assert_eq!(status_for(Code::Unavailable), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(status_for(Code::Internal), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            status_for(Code::ResourceExhausted),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
