use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::error;
use yathra_conversation::ConversationError;

/// Errors surfaced to HTTP callers. Upstream model failures never get
/// here; they are answered with the apology text instead.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid request body")]
    InvalidRequest,

    #[error("Internal Server Error")]
    Internal(String),
}

impl From<ConversationError> for ApiError {
    fn from(err: ConversationError) -> Self {
        match err {
            ConversationError::InvalidInput(_) => Self::InvalidRequest,
            other => Self::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::InvalidRequest => StatusCode::BAD_REQUEST,
            Self::Internal(detail) => {
                error!("Error in chat endpoint: {detail}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_input_maps_to_bad_request() {
        let err = ApiError::from(ConversationError::InvalidInput("user input is empty"));
        assert_eq!(err.to_string(), "Invalid request body");
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_internal_error_hides_detail() {
        let err = ApiError::from(ConversationError::Internal("caller identity is empty".into()));
        assert_eq!(err.to_string(), "Internal Server Error");
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
