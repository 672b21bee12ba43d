//! Caller-facing error taxonomy.
//!
//! Every failure a request can hit maps to exactly one variant here, and
//! every variant has a fixed HTTP status. Handlers return `ApiError`
//! directly; the `IntoResponse` impl renders the `{"error": ...}` body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("API key is required")]
    MissingCredential,

    #[error("upstream request timed out")]
    UpstreamTimeout,

    #[error("lost connection to upstream provider")]
    UpstreamConnectionLost,

    /// The provider answered with a non-success status or an unparseable
    /// body; its status code is passed through to the caller.
    #[error("{message}")]
    Upstream { status: u16, message: String },

    #[error("provider returned no generated text")]
    EmptyGeneration,

    #[error("provider returned no image data")]
    NoImageGenerated,

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("failed to persist stories: {0}")]
    StorageWrite(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingCredential
            | Self::EmptyGeneration
            | Self::NoImageGenerated
            | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::UpstreamTimeout => StatusCode::GATEWAY_TIMEOUT,
            Self::UpstreamConnectionLost => StatusCode::SERVICE_UNAVAILABLE,
            Self::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::StorageWrite(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::MissingCredential.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::UpstreamTimeout.status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(
            ApiError::UpstreamConnectionLost.status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(ApiError::EmptyGeneration.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::NoImageGenerated.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::NotFound("Story".to_string()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Validation("id required".to_string()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::StorageWrite("disk full".to_string()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_upstream_status_passes_through() {
        let err = ApiError::Upstream {
            status: 429,
            message: "rate limited".to_string(),
        };
        assert_eq!(err.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(err.to_string(), "rate limited");
    }

    #[test]
    fn test_invalid_upstream_status_falls_back_to_bad_gateway() {
        let err = ApiError::Upstream {
            status: 23,
            message: "garbage".to_string(),
        };
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
    }
}
