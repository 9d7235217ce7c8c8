//! API error handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use domain_replay::ReplayError;
use domain_update::UpdateError;

use crate::auth::AuthError;

/// API error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The record may not be deleted
    #[error("{0}")]
    ProtectedRecord(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
            ApiError::Unauthorized => {
                (StatusCode::UNAUTHORIZED, "unauthorized", "Unauthorized".to_string())
            }
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg.clone()),
            ApiError::ProtectedRecord(msg) => {
                (StatusCode::FORBIDDEN, "protected_record", msg.clone())
            }
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone()),
            ApiError::ServiceUnavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable", msg.clone())
            }
            ApiError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg.clone())
            }
            ApiError::Database(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", msg.clone())
            }
            ApiError::Validation(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "validation_error", msg.clone())
            }
        };

        let body = ErrorResponse {
            error: error_type.to_string(),
            message,
            details: None,
        };

        (status, Json(body)).into_response()
    }
}

impl From<UpdateError> for ApiError {
    fn from(err: UpdateError) -> Self {
        match err {
            UpdateError::ProtectedRecord { .. } => ApiError::ProtectedRecord(err.to_string()),
            UpdateError::NotFound(_) => ApiError::NotFound(err.to_string()),
            UpdateError::MissingField(_) | UpdateError::ReadOnlyField(_) => {
                ApiError::Validation(err.to_string())
            }
            UpdateError::Port(ref port) if port.is_transient() => {
                ApiError::ServiceUnavailable(err.to_string())
            }
            UpdateError::Port(_) | UpdateError::InvalidSequence(_) => {
                ApiError::Database(err.to_string())
            }
            UpdateError::Serialization(_) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<ReplayError> for ApiError {
    fn from(err: ReplayError) -> Self {
        match err {
            ReplayError::Ledger(inner) => inner.into(),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingPermission(role) => {
                ApiError::Forbidden(format!("missing permission {}", role))
            }
            AuthError::InvalidToken | AuthError::TokenExpired => ApiError::Unauthorized,
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        ApiError::Validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::PortError;

    #[test]
    fn test_protected_record_is_forbidden() {
        let response = ApiError::from(UpdateError::ProtectedRecord { count: 1 }).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_ledger_error_mapping() {
        assert!(matches!(ApiError::from(UpdateError::not_found("UPD-1")), ApiError::NotFound(_)));
        assert!(matches!(
            ApiError::from(UpdateError::ReadOnlyField("sequence")),
            ApiError::Validation(_)
        ));
        assert!(matches!(
            ApiError::from(UpdateError::Port(PortError::connection("refused"))),
            ApiError::ServiceUnavailable(_)
        ));
        assert!(matches!(
            ApiError::from(ReplayError::Ledger(UpdateError::InvalidSequence("x".into()))),
            ApiError::Database(_)
        ));
    }
}
