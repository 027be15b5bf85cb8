//! Boundary errors and their HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use fivegc_core::CoreError;
use fivegc_credential::CredentialError;
use serde_json::json;

/// Error type returned by every handler
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Missing, malformed or expired bearer token
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Valid token that does not grant the request
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Malformed body, path or query
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Group/kind pair that names no resource
    #[error("unknown resource {group}/{kind}")]
    UnknownKind {
        /// Path group segment
        group: String,
        /// Path kind segment
        kind: String,
    },

    /// Store rejected the operation
    #[error(transparent)]
    Store(#[from] CoreError),
}

impl ApiError {
    /// HTTP status for this error
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::UnknownKind { .. } => StatusCode::NOT_FOUND,
            ApiError::Store(err) => match err {
                CoreError::NotFound { .. } => StatusCode::NOT_FOUND,
                CoreError::AlreadyExists { .. } | CoreError::Conflict { .. } => {
                    StatusCode::CONFLICT
                }
                CoreError::Invalid { .. } | CoreError::Serialization { .. } => {
                    StatusCode::BAD_REQUEST
                }
                CoreError::Storage { .. } => StatusCode::SERVICE_UNAVAILABLE,
                CoreError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl From<CredentialError> for ApiError {
    fn from(err: CredentialError) -> Self {
        ApiError::Unauthorized(err.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "request rejected");
        }
        let body = Json(json!({
            "code": status.as_u16(),
            "error": self.to_string(),
        }));
        (status, body).into_response()
    }
}
