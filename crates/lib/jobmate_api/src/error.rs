//! Application error types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use jobmate_core::auth::AuthError;
use thiserror::Error;
use tracing::error;

use crate::models::ErrorResponse;

/// Convenience alias for handler return types.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level errors with HTTP status mapping.
///
/// Server-side variants carry their cause for the log only; clients get a
/// generic message.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Too many requests: {0}")]
    TooManyRequests(String),

    #[error("Upstream provider error")]
    BadGateway(String),

    #[error("Request timed out")]
    Timeout(String),

    #[error("Internal server error")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, message) = match &self {
            AppError::Validation(m) => (StatusCode::BAD_REQUEST, "validation_error", m.as_str()),
            AppError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, "unauthorized", m.as_str()),
            AppError::Forbidden(m) => (StatusCode::FORBIDDEN, "forbidden", m.as_str()),
            AppError::NotFound(m) => (StatusCode::NOT_FOUND, "not_found", m.as_str()),
            AppError::Conflict(m) => (StatusCode::CONFLICT, "conflict", m.as_str()),
            AppError::TooManyRequests(m) => {
                (StatusCode::TOO_MANY_REQUESTS, "rate_limited", m.as_str())
            }
            AppError::BadGateway(detail) => {
                error!(detail = %detail, "upstream provider failure");
                (
                    StatusCode::BAD_GATEWAY,
                    "upstream_error",
                    "Sign-in provider is unavailable",
                )
            }
            AppError::Timeout(operation) => {
                error!(operation = %operation, "operation timed out");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "timeout",
                    "Request timed out, please try again",
                )
            }
            AppError::Internal(detail) => {
                error!(detail = %detail, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error",
                )
            }
        };
        let body = Json(ErrorResponse {
            error: error.to_string(),
            message: message.to_string(),
        });
        (status, body).into_response()
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::InvalidInput(msg) => AppError::Validation(msg),
            AuthError::WeakPassword
            | AuthError::InvalidEmailFormat
            | AuthError::InvalidPhoneFormat
            | AuthError::InvalidOtp
            | AuthError::OtpExpired
            | AuthError::InvalidOAuthUserData => AppError::Validation(e.to_string()),
            AuthError::EmailAlreadyExists
            | AuthError::PhoneAlreadyExists
            | AuthError::OtpUseFailed => AppError::Conflict(e.to_string()),
            AuthError::OAuthProviderMismatch { .. } => {
                AppError::Conflict("This email is linked to a different sign-in method".into())
            }
            AuthError::RateLimited => AppError::TooManyRequests(e.to_string()),
            AuthError::InvalidCredentials | AuthError::TokenVerificationFailed => {
                AppError::Unauthorized(e.to_string())
            }
            AuthError::OAuthUserCannotLoginWithPassword | AuthError::EmailNotVerified => {
                AppError::Forbidden(e.to_string())
            }
            AuthError::UnsupportedProvider(_) => AppError::NotFound(e.to_string()),
            AuthError::OAuthExchangeFailed(detail) => AppError::BadGateway(detail),
            AuthError::Timeout(operation) => AppError::Timeout(operation.to_string()),
            AuthError::PasswordHashingFailed(_)
            | AuthError::TokenGenerationFailed(_)
            | AuthError::UserNotFound
            | AuthError::DatabaseOperationFailed(_) => AppError::Internal(e.to_string()),
        }
    }
}
