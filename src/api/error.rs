use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};

use crate::types::ErrorResponse;

/// Failures reported before a stream opens
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Missing or unparseable request body
    #[error("{0}")]
    MalformedRequest(String),
    /// A required field or parameter is missing or out of range
    #[error("{message}")]
    InvalidParams { code: &'static str, message: String },
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MalformedRequest(_) | ApiError::InvalidParams { .. } => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::MalformedRequest(_) => "MALFORMED_REQUEST",
            ApiError::InvalidParams { code, .. } => *code,
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, "rejected request");
        }
        let body = ErrorResponse {
            error: self.to_string(),
            code: self.code().to_string(),
        };
        (status, Json(body)).into_response()
    }
}
