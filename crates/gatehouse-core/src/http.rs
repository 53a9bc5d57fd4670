//! Maps [`AppError`] to HTTP responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, ErrorKind};

/// Standard API error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// Machine-readable error code.
    pub error: String,
    /// Human-readable message.
    pub message: String,
}

impl AppError {
    /// HTTP status for this error.
    pub fn status_code(&self) -> StatusCode {
        match self.kind {
            kind if kind.is_authentication() => StatusCode::UNAUTHORIZED,
            kind if kind.is_unavailable() => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-visible `(code, message)` pair.
    ///
    /// Authentication kinds share one answer so that an expired token cannot
    /// be told apart from a forged one.
    pub fn public_parts(&self) -> (&'static str, String) {
        match self.kind {
            kind if kind.is_authentication() => {
                ("UNAUTHORIZED", "Authentication required".to_string())
            }
            kind if kind.is_unavailable() => {
                ("SERVICE_UNAVAILABLE", "Service unavailable".to_string())
            }
            ErrorKind::Forbidden => ("FORBIDDEN", "Access denied".to_string()),
            ErrorKind::NotFound => ("NOT_FOUND", self.message.clone()),
            ErrorKind::Validation => ("VALIDATION_ERROR", self.message.clone()),
            ErrorKind::Conflict => ("CONFLICT", self.message.clone()),
            _ => ("INTERNAL_ERROR", "Internal server error".to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(kind = %self.kind, error = %self.message, "Internal server error");
        }

        let (code, message) = self.public_parts();
        let body = ApiErrorResponse {
            error: code.to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}
