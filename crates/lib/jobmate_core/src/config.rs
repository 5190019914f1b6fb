//! Immutable configuration values injected into the auth components.

use std::time::Duration;

/// Access token lifetime: 15 minutes.
pub const DEFAULT_ACCESS_TOKEN_TTL: Duration = Duration::from_secs(15 * 60);

/// Refresh token signature lifetime: 7 days.
pub const DEFAULT_REFRESH_SIGNATURE_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Refresh session (stored record) lifetime: 60 days.
pub const DEFAULT_REFRESH_SESSION_TTL: Duration = Duration::from_secs(60 * 24 * 60 * 60);

/// bcrypt cost factor.
pub const DEFAULT_BCRYPT_COST: u32 = 10;

/// Signing secrets and lifetimes for the token issuer.
///
/// The signature lifetime of a refresh JWT bounds forgeability; the stored
/// record's lifetime bounds the session. The two are configured separately.
#[derive(Clone)]
pub struct TokenConfig {
    pub access_secret: String,
    pub refresh_secret: String,
    pub access_ttl: Duration,
    pub refresh_signature_ttl: Duration,
    pub refresh_session_ttl: Duration,
}

impl TokenConfig {
    /// Config with default lifetimes.
    pub fn new(access_secret: impl Into<String>, refresh_secret: impl Into<String>) -> Self {
        Self {
            access_secret: access_secret.into(),
            refresh_secret: refresh_secret.into(),
            access_ttl: DEFAULT_ACCESS_TOKEN_TTL,
            refresh_signature_ttl: DEFAULT_REFRESH_SIGNATURE_TTL,
            refresh_session_ttl: DEFAULT_REFRESH_SESSION_TTL,
        }
    }
}

impl std::fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenConfig")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_signature_ttl", &self.refresh_signature_ttl)
            .field("refresh_session_ttl", &self.refresh_session_ttl)
            .finish_non_exhaustive()
    }
}

/// One-time code policy.
#[derive(Debug, Clone, Copy)]
pub struct OtpPolicy {
    /// Number of digits.
    pub length: usize,
    pub expiry: Duration,
    /// Maximum codes per contact point within `rate_limit_window`.
    pub rate_limit_count: i64,
    pub rate_limit_window: Duration,
}

impl Default for OtpPolicy {
    fn default() -> Self {
        Self {
            length: 6,
            expiry: Duration::from_secs(5 * 60),
            rate_limit_count: 3,
            rate_limit_window: Duration::from_secs(10 * 60),
        }
    }
}

/// Wall-clock budget per operation.
#[derive(Debug, Clone, Copy)]
pub struct OperationTimeouts {
    pub register: Duration,
    pub login: Duration,
    pub oauth_login: Duration,
    pub logout: Duration,
    pub refresh: Duration,
    pub otp_request: Duration,
}

impl Default for OperationTimeouts {
    fn default() -> Self {
        Self {
            register: Duration::from_secs(10),
            login: Duration::from_secs(10),
            oauth_login: Duration::from_secs(15),
            logout: Duration::from_secs(5),
            refresh: Duration::from_secs(5),
            otp_request: Duration::from_secs(10),
        }
    }
}

/// Everything the auth orchestrator and OTP service need at construction.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub tokens: TokenConfig,
    pub otp: OtpPolicy,
    pub bcrypt_cost: u32,
    pub timeouts: OperationTimeouts,
}

impl AuthConfig {
    pub fn new(tokens: TokenConfig) -> Self {
        Self {
            tokens,
            otp: OtpPolicy::default(),
            bcrypt_cost: DEFAULT_BCRYPT_COST,
            timeouts: OperationTimeouts::default(),
        }
    }
}
