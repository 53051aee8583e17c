//! Error types for the HTTP API.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use scribe_alerts::AlertError;
use scribe_docs::DocError;
use scribe_store::StoreError;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Result type alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors that can occur in the server.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Failed to bind to the specified address.
    #[error("failed to bind to {0}: {1}")]
    BindFailed(std::net::SocketAddr, std::io::Error),

    /// Malformed request.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Alert pipeline error.
    #[error(transparent)]
    Alert(#[from] AlertError),

    /// Template or document error.
    #[error(transparent)]
    Doc(#[from] DocError),

    /// Persistence error outside the services.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidRequest(rejection.body_text())
    }
}

impl ApiError {
    /// Returns the HTTP status and machine-readable code.
    #[must_use]
    pub fn classify(&self) -> (StatusCode, &'static str) {
        match self {
            Self::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
            Self::Alert(AlertError::InvalidPayload { .. }) => {
                (StatusCode::BAD_REQUEST, "invalid_payload")
            }
            Self::Alert(AlertError::AlreadyProcessed { .. }) => {
                (StatusCode::BAD_REQUEST, "already_processed")
            }
            Self::Alert(AlertError::NotFound { .. }) => (StatusCode::NOT_FOUND, "not_found"),
            Self::Alert(AlertError::ClaimConflict { .. }) => (StatusCode::CONFLICT, "conflict"),
            Self::Doc(DocError::Validation(_)) => (StatusCode::BAD_REQUEST, "validation_error"),
            Self::Doc(DocError::TemplateNotFound(_) | DocError::DocumentNotFound(_)) => {
                (StatusCode::NOT_FOUND, "not_found")
            }
            Self::Doc(DocError::TemplateCompile(_)) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "template_error")
            }
            Self::Alert(AlertError::Store(_))
            | Self::Doc(DocError::Store(_))
            | Self::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "storage_error"),
            Self::BindFailed(_, _) | Self::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
        }
    }
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type) = self.classify();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }

        let body = ErrorResponse {
            error: error_type.to_string(),
            message: self.to_string(),
        };

        let json = serde_json::to_string(&body).unwrap_or_else(|_| {
            r#"{"error":"internal_error","message":"failed to serialize error"}"#.to_string()
        });

        (status, [("content-type", "application/json")], json).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use test_case::test_case;

    #[test_case(ApiError::InvalidRequest("x".into()), StatusCode::BAD_REQUEST ; "invalid request")]
    #[test_case(ApiError::Alert(AlertError::InvalidPayload { reason: "x".into() }), StatusCode::BAD_REQUEST ; "invalid payload")]
    #[test_case(ApiError::Alert(AlertError::AlreadyProcessed { id: "a".into() }), StatusCode::BAD_REQUEST ; "already processed")]
    #[test_case(ApiError::Alert(AlertError::NotFound { id: "a".into() }), StatusCode::NOT_FOUND ; "alert not found")]
    #[test_case(ApiError::Alert(AlertError::ClaimConflict { fingerprint: "f".into() }), StatusCode::CONFLICT ; "claim conflict")]
    #[test_case(ApiError::Doc(DocError::Validation("x".into())), StatusCode::BAD_REQUEST ; "validation")]
    #[test_case(ApiError::Doc(DocError::TemplateNotFound("t".into())), StatusCode::NOT_FOUND ; "template not found")]
    #[test_case(ApiError::Doc(DocError::DocumentNotFound("d".into())), StatusCode::NOT_FOUND ; "document not found")]
    #[test_case(ApiError::Doc(DocError::TemplateCompile("x".into())), StatusCode::UNPROCESSABLE_ENTITY ; "template compile")]
    #[test_case(ApiError::Store(StoreError::InvalidId("x".into())), StatusCode::INTERNAL_SERVER_ERROR ; "store")]
    #[test_case(ApiError::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR ; "internal")]
    fn status_mapping(err: ApiError, expected: StatusCode) {
        assert_eq!(err.classify().0, expected);
    }

    #[tokio::test]
    async fn test_not_found_error_response() {
        let response = ApiError::Doc(DocError::TemplateNotFound("abc123".into())).into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(json["error"], "not_found");
        assert_eq!(json["message"], "template not found: abc123");
    }

    #[tokio::test]
    async fn test_compile_error_carries_message() {
        let response =
            ApiError::Doc(DocError::TemplateCompile("unclosed block".into())).into_response();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["error"], "template_error");
        assert!(json["message"].as_str().unwrap().contains("unclosed block"));
    }
}
