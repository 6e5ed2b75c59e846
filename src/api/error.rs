//! Shared error handling for API endpoints.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::warn;

use crate::backend::BackendError;

/// API error type with automatic response conversion.
pub enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    /// The backend could not be reached; the caller should retry later.
    BadGateway(String),
    Internal(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Map a backend failure onto the API surface. Transport failures
    /// become a generic retry-later response; rejections carry the
    /// backend's own status and message through.
    pub fn from_backend(context: &str, e: BackendError) -> Self {
        match e {
            BackendError::Unavailable(detail) => {
                warn!("{}: backend unreachable: {}", context, detail);
                Self::BadGateway("Service temporarily unavailable, try again later".into())
            }
            BackendError::Rejected { status, message } => match status {
                401 => Self::Unauthorized(message),
                403 => Self::Forbidden(message),
                400..=499 => Self::BadRequest(message),
                _ => {
                    warn!("{}: backend error {}: {}", context, status, message);
                    Self::Internal(message)
                }
            },
            BackendError::Malformed => {
                warn!("{}: backend response was malformed", context);
                Self::BadGateway("Service temporarily unavailable, try again later".into())
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

/// Validate an email address enough to catch obviously malformed input.
/// The backend does its own authoritative validation.
pub fn validate_email(email: &str) -> Result<(), ApiError> {
    if email.is_empty() {
        return Err(ApiError::bad_request("Email cannot be empty"));
    }
    if email.len() > 254 || !email.contains('@') || email.starts_with('@') || email.ends_with('@')
    {
        return Err(ApiError::bad_request("Invalid email address"));
    }
    Ok(())
}

/// Validate a password against the minimum length the backend enforces.
pub fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.len() < 8 {
        return Err(ApiError::bad_request(
            "Password must be at least 8 characters",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email() {
        assert!(validate_email("alice@example.com").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("alice@").is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("hunter2hunter2").is_ok());
        assert!(validate_password("short").is_err());
    }

    #[test]
    fn test_backend_unavailable_maps_to_bad_gateway() {
        let err = ApiError::from_backend(
            "test",
            BackendError::Unavailable("connection refused".to_string()),
        );
        assert!(matches!(err, ApiError::BadGateway(_)));
    }

    #[test]
    fn test_backend_rejection_keeps_message() {
        let err = ApiError::from_backend(
            "test",
            BackendError::Rejected {
                status: 401,
                message: "Wrong password".to_string(),
            },
        );
        match err {
            ApiError::Unauthorized(msg) => assert_eq!(msg, "Wrong password"),
            _ => panic!("expected Unauthorized"),
        }
    }
}
