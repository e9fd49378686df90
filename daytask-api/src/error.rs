/// Error handling for the API server
///
/// This module provides a unified error type that maps to HTTP responses.
/// All handlers return `Result<T, ApiError>` which automatically converts to
/// the appropriate HTTP status code.
///
/// Two rules shape the mapping:
///
/// - Recoverable caller mistakes (validation, duplicate email) map to 400
///   with a short, generic message.
/// - Nothing internal leaks: internal errors and store outages are logged
///   server-side with full detail but reported to the caller with a fixed
///   generic body — no driver text, no stack traces. A missing resource and
///   a resource owned by someone else produce the same 404.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use daytask_shared::auth::credentials::CredentialError;
use daytask_shared::auth::password::PasswordError;
use daytask_shared::db::connection::StoreError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Bad request (400) - malformed or missing input
    BadRequest(String),

    /// Bad request (400) - field-level validation failures
    Validation(Vec<ValidationErrorDetail>),

    /// Bad request (400) - email already registered
    DuplicateEmail,

    /// Unauthorized (401) - bad credentials or no valid session
    Unauthorized(String),

    /// Not found (404) - missing or not owned, indistinguishable
    NotFound(String),

    /// Internal server error (500)
    Internal(String),

    /// Service unavailable (503) - database unreachable
    StoreUnavailable(String),
}

/// Validation error detail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    /// Field that failed validation
    pub field: String,

    /// Error message
    pub message: String,
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code (e.g., "bad_request", "unauthorized")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// Optional validation errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationErrorDetail>>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::Validation(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::DuplicateEmail => write!(f, "Email already exists"),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::Internal(msg) => write!(f, "Internal error: {}", msg),
            ApiError::StoreUnavailable(msg) => write!(f, "Store unavailable: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message, details) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg, None),
            ApiError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                "validation_error",
                "Request validation failed".to_string(),
                Some(errors),
            ),
            ApiError::DuplicateEmail => (
                StatusCode::BAD_REQUEST,
                "duplicate_email",
                "Email already exists".to_string(),
                None,
            ),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg, None),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None),
            ApiError::Internal(msg) => {
                // Log internal errors but don't expose details to clients
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
            ApiError::StoreUnavailable(msg) => {
                tracing::error!("Database unavailable for request: {}", msg);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "service_unavailable",
                    "Service temporarily unavailable".to_string(),
                    None,
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
            details,
        });

        (status, body).into_response()
    }
}

/// Convert sqlx errors to API errors
impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound("Resource not found".to_string()),
            sqlx::Error::Database(db_err) => {
                // The unique index on LOWER(email) closes the race between a
                // duplicate check and the insert; surface it as a duplicate,
                // not an internal failure.
                if let Some(constraint) = db_err.constraint() {
                    if constraint.contains("email") {
                        return ApiError::DuplicateEmail;
                    }
                }

                ApiError::Internal(format!("Database error: {}", db_err))
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                ApiError::StoreUnavailable(err.to_string())
            }
            _ => ApiError::Internal(format!("Database error: {}", err)),
        }
    }
}

/// Convert connection-manager errors to API errors
impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::StoreUnavailable(err.to_string())
    }
}

/// Convert password errors to API errors
impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::Internal(format!("Password operation failed: {}", err))
    }
}

/// Convert credential errors to API errors
///
/// Unknown email and wrong password collapse into one generic 401 so the
/// response never reveals which part of the pair was wrong.
impl From<CredentialError> for ApiError {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::UnknownEmail | CredentialError::WrongPassword => {
                ApiError::Unauthorized("Invalid email or password".to_string())
            }
            CredentialError::Hash(e) => ApiError::from(e),
            CredentialError::Store(e) => ApiError::from(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ApiError::BadRequest("Invalid due date".to_string());
        assert_eq!(err.to_string(), "Bad request: Invalid due date");

        let err = ApiError::NotFound("Task not found".to_string());
        assert_eq!(err.to_string(), "Not found: Task not found");
    }

    #[test]
    fn test_status_codes() {
        let cases = [
            (ApiError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
            (ApiError::Validation(vec![]), StatusCode::BAD_REQUEST),
            (ApiError::DuplicateEmail, StatusCode::BAD_REQUEST),
            (ApiError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED),
            (ApiError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (
                ApiError::Internal("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                ApiError::StoreUnavailable("x".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }

    #[tokio::test]
    async fn internal_detail_is_not_leaked() {
        let err = ApiError::Internal("connection to 10.0.0.3:5432 refused".to_string());
        let response = err.into_response();

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let parsed: ErrorResponse = serde_json::from_slice(&body).unwrap();

        assert_eq!(parsed.error, "internal_error");
        assert_eq!(parsed.message, "An internal error occurred");
    }

    #[tokio::test]
    async fn store_outage_detail_is_not_leaked() {
        let err = ApiError::StoreUnavailable("pool timed out".to_string());
        let response = err.into_response();

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let parsed: ErrorResponse = serde_json::from_slice(&body).unwrap();

        assert_eq!(parsed.error, "service_unavailable");
        assert_eq!(parsed.message, "Service temporarily unavailable");
    }

    #[test]
    fn credential_failures_are_indistinguishable() {
        let unknown = ApiError::from(CredentialError::UnknownEmail);
        let wrong = ApiError::from(CredentialError::WrongPassword);

        let (ApiError::Unauthorized(a), ApiError::Unauthorized(b)) = (unknown, wrong) else {
            panic!("expected unauthorized for both credential failures");
        };
        assert_eq!(a, b);
    }
}
