//! Gateway error types

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use ragline_kernel::RagError;
use serde_json::json;
use thiserror::Error;

/// Gateway-level errors
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Rag(#[from] RagError),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            GatewayError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
            GatewayError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            GatewayError::Rag(err) => match err {
                RagError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
                RagError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "INVALID_INPUT"),
                RagError::Configuration(_) | RagError::DimensionMismatch { .. } => {
                    (StatusCode::BAD_REQUEST, "CONFIGURATION_ERROR")
                }
                RagError::UnsupportedFormat(_) => {
                    (StatusCode::UNSUPPORTED_MEDIA_TYPE, "UNSUPPORTED_FORMAT")
                }
                RagError::Provider { .. } => (StatusCode::BAD_GATEWAY, "PROVIDER_ERROR"),
                RagError::RetrievalFailed { .. } if err.is_configuration() => {
                    (StatusCode::BAD_REQUEST, "CONFIGURATION_ERROR")
                }
                RagError::RetrievalFailed { .. } => (StatusCode::BAD_GATEWAY, "RETRIEVAL_FAILED"),
                RagError::DeadlineExceeded { .. } => {
                    (StatusCode::GATEWAY_TIMEOUT, "DEADLINE_EXCEEDED")
                }
                RagError::Storage(_) | RagError::Serialization(_) | RagError::Io(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
                }
            },
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!(code, error = %self, "request failed");
        }

        let mut error = json!({
            "code": code,
            "message": self.to_string(),
        });
        if let GatewayError::Rag(err) = &self {
            if let Some(stage) = err.stage() {
                error["stage"] = json!(stage);
            }
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;
