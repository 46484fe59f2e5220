//! HTTP error responses for the passthrough API

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Passthrough API errors
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or malformed request fields
    #[error("{0}")]
    BadRequest(String),

    /// Store read/write failure
    #[error(transparent)]
    Store(#[from] carelink_common::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
            ApiError::Store(carelink_common::Error::InvalidInput(msg)) => {
                (StatusCode::BAD_REQUEST, "invalid_input", msg.clone())
            }
            ApiError::Store(e) => {
                error!("Store operation failed: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "store_error", e.to_string())
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_errors_map_to_status() {
        let invalid = ApiError::Store(carelink_common::Error::InvalidInput("phone".into()));
        assert_eq!(invalid.into_response().status(), StatusCode::BAD_REQUEST);

        let remote = ApiError::Store(carelink_common::Error::Remote("down".into()));
        assert_eq!(remote.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
