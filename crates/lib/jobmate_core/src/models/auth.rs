//! Authentication domain models: token claims, sessions, verification codes.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::identity::UserProfile;

// =============================================================================
// Token claims
// =============================================================================

/// JWT claims embedded in access tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject - identity ID (standard JWT `sub` claim).
    pub sub: String,
    /// Locale tag, e.g. `"en"`.
    pub lang: String,
    /// Issued at (unix timestamp).
    pub iat: i64,
    /// Expiry (unix timestamp).
    pub exp: i64,
}

/// JWT claims embedded in refresh tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: String,
    /// Random token id; keeps two sessions issued in the same second distinct.
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

// =============================================================================
// Sessions
// =============================================================================

/// Refresh token record. Only the SHA-256 hash of the raw token is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshTokenRecord {
    pub id: String,
    pub user_id: String,
    pub token_hash: String,
    pub revoked: bool,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl RefreshTokenRecord {
    /// A record is usable only while unrevoked and unexpired.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        !self.revoked && now < self.expires_at
    }
}

/// Result of a successful Login or OAuthLogin.
#[derive(Clone)]
pub struct LoginResult {
    pub access_token: String,
    pub refresh_token: String,
    /// Access-token time-to-live.
    pub expires_in: Duration,
    /// Refresh-session time-to-live (lifetime of the stored record).
    pub refresh_expires_in: Duration,
    pub user: UserProfile,
}

impl fmt::Debug for LoginResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginResult")
            .field("expires_in", &self.expires_in)
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

/// Result of a successful RefreshToken rotation.
#[derive(Clone)]
pub struct RefreshOutcome {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: Duration,
    pub refresh_expires_in: Duration,
}

impl fmt::Debug for RefreshOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshOutcome")
            .field("expires_in", &self.expires_in)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Verification codes
// =============================================================================

/// What a verification code was issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "otp_purpose", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OtpPurpose {
    Registration,
    PasswordReset,
}

/// An email address or phone number a code can be delivered to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ContactPoint {
    Email(String),
    Phone(String),
}

impl ContactPoint {
    pub fn value(&self) -> &str {
        match self {
            ContactPoint::Email(v) | ContactPoint::Phone(v) => v,
        }
    }
}

impl fmt::Display for ContactPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContactPoint::Email(v) => write!(f, "email:{v}"),
            ContactPoint::Phone(v) => write!(f, "phone:{v}"),
        }
    }
}

/// Stored one-time code. `code_hash` is a bcrypt hash of the numeric code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationCode {
    pub id: String,
    pub user_id: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub code_hash: String,
    pub purpose: OtpPurpose,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
    pub created_at: DateTime<Utc>,
}

impl VerificationCode {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Verification code fields supplied at creation time.
#[derive(Debug, Clone)]
pub struct NewVerificationCode {
    pub user_id: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub code_hash: String,
    pub purpose: OtpPurpose,
    pub expires_at: DateTime<Utc>,
}

/// Request for a registration code.
#[derive(Debug, Clone, Default)]
pub struct OtpRequest {
    pub email: String,
    pub phone: Option<String>,
    /// Client address, recorded for diagnostics.
    pub requestor_ip: Option<String>,
}
