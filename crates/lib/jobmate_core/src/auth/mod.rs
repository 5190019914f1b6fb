//! Authentication and token lifecycle.
//!
//! Leaf primitives (password hashing, JWT issuing, one-time codes, input
//! validation) and the orchestrator that composes them into Register,
//! Login, OAuthLogin, Logout and RefreshToken.

pub mod jwt;
pub mod otp;
pub mod password;
pub mod service;
pub mod validation;

#[cfg(test)]
mod tests;

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

use crate::store::StoreError;

pub use jwt::TokenIssuer;
pub use otp::OtpService;
pub use password::PasswordHasher;
pub use service::AuthService;

/// Authentication errors.
///
/// Messages are safe to show to clients; store and crypto causes are kept in
/// the payload for server-side logs only.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Password must be at least 8 characters and contain a letter and a digit")]
    WeakPassword,

    #[error("Invalid email format")]
    InvalidEmailFormat,

    #[error("Invalid phone number")]
    InvalidPhoneFormat,

    #[error("Email already exists")]
    EmailAlreadyExists,

    #[error("Phone number already exists")]
    PhoneAlreadyExists,

    #[error("Invalid verification code")]
    InvalidOtp,

    #[error("Verification code expired")]
    OtpExpired,

    #[error("Verification code could not be used")]
    OtpUseFailed,

    #[error("Too many verification requests, please try again later")]
    RateLimited,

    #[error("Password hashing failed: {0}")]
    PasswordHashingFailed(String),

    #[error("Token generation failed: {0}")]
    TokenGenerationFailed(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("This account uses OAuth login only")]
    OAuthUserCannotLoginWithPassword,

    #[error("OAuth provider mismatch: expected '{expected}' but got '{actual}'")]
    OAuthProviderMismatch { expected: String, actual: String },

    #[error("Invalid OAuth user data")]
    InvalidOAuthUserData,

    #[error("Unsupported OAuth provider: {0}")]
    UnsupportedProvider(String),

    #[error("OAuth exchange failed: {0}")]
    OAuthExchangeFailed(String),

    #[error("Email not verified")]
    EmailNotVerified,

    #[error("Token verification failed")]
    TokenVerificationFailed,

    #[error("User not found")]
    UserNotFound,

    #[error("Database operation failed: {0}")]
    DatabaseOperationFailed(String),

    #[error("Operation timed out: {0}")]
    Timeout(&'static str),
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        AuthError::DatabaseOperationFailed(e.to_string())
    }
}

/// Run `fut` within `budget`. On expiry the future is dropped, which abandons
/// any in-flight store call, and [`AuthError::Timeout`] is returned.
///
/// Multi-step operations are not rolled back when abandoned part-way.
pub(crate) async fn with_deadline<T, F>(
    budget: Duration,
    operation: &'static str,
    fut: F,
) -> Result<T, AuthError>
where
    F: Future<Output = Result<T, AuthError>>,
{
    match tokio::time::timeout(budget, fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(operation, budget_ms = budget.as_millis() as u64, "Deadline exceeded");
            Err(AuthError::Timeout(operation))
        }
    }
}
