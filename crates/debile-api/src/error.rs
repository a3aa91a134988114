//! API error handling.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// API error type.
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    Conflict(String),
    InvalidState(String),
    Credential(String),
    Internal(String),
}

impl ApiError {
    fn parts(self) -> (StatusCode, &'static str, String) {
        match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "validation_error", msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "already_exists", msg),
            ApiError::InvalidState(msg) => (StatusCode::CONFLICT, "invalid_state", msg),
            ApiError::Credential(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "credential_error", msg)
            }
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal", msg),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, message) = self.parts();
        if status.is_server_error() {
            tracing::error!(%kind, %message, "Request failed");
        }

        let body = Json(json!({
            "error": message,
            "kind": kind,
        }));

        (status, body).into_response()
    }
}

impl From<debile_core::Error> for ApiError {
    fn from(err: debile_core::Error) -> Self {
        match err {
            debile_core::Error::NotFound(msg) => ApiError::NotFound(msg),
            debile_core::Error::AlreadyExists(msg) => ApiError::Conflict(msg),
            debile_core::Error::Credential(msg) => ApiError::Credential(msg),
            debile_core::Error::Validation(msg) => ApiError::BadRequest(msg),
            debile_core::Error::InvalidState(msg) => ApiError::InvalidState(msg),
            debile_core::Error::Unauthorized(msg) => ApiError::Unauthorized(msg),
            debile_core::Error::Forbidden(msg) => ApiError::Forbidden(msg),
            debile_core::Error::Internal(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<debile_db::DbError> for ApiError {
    fn from(err: debile_db::DbError) -> Self {
        match err {
            debile_db::DbError::NotFound(msg) => ApiError::NotFound(msg),
            debile_db::DbError::Duplicate(msg) => ApiError::Conflict(msg),
            _ => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}
