// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! API error types and response formatting.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::auth::AuthError;
use crate::content::ContentError;
use crate::transport::TransportError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("invalid credentials")]
    Unauthorized,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    /// Simulated drop. Clients are expected to retry.
    #[error("transfer dropped: {0}")]
    Unavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// JSON error response body.
#[derive(Debug, Clone, Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "invalid_credentials", None),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg)),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", Some(msg)),
            Self::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, "transfer_dropped", Some(msg)),
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    Some("An internal error occurred".to_string()),
                )
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => Self::Unauthorized,
        }
    }
}

impl From<ContentError> for ApiError {
    fn from(err: ContentError) -> Self {
        match err {
            ContentError::NotFound(_) => Self::NotFound(err.to_string()),
            ContentError::AlreadyExists(_) => Self::BadRequest(err.to_string()),
        }
    }
}

impl From<TransportError> for ApiError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::NotFound(id) => Self::NotFound(format!("content {} not found", id)),
            TransportError::InvalidCredentials => Self::Unauthorized,
            TransportError::BadRequest(msg) => Self::BadRequest(msg),
            TransportError::Transient(msg) => Self::Unavailable(msg),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let status = |err: ApiError| err.into_response().status();
        assert_eq!(status(TransportError::NotFound(9).into()), StatusCode::NOT_FOUND);
        assert_eq!(status(AuthError::InvalidCredentials.into()), StatusCode::UNAUTHORIZED);
        assert_eq!(status(ApiError::BadRequest("missing".into())), StatusCode::BAD_REQUEST);
        assert_eq!(
            status(TransportError::Transient("simulated drop".into()).into()),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status(TransportError::Protocol("garbled".into()).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
