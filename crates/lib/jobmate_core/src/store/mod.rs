//! Storage contracts for identities, refresh sessions and verification codes.
//!
//! Cross-request coordination lives here, not in the orchestrator: every
//! check-then-set (revoking a session, consuming a code) is one conditional
//! store call, so two racing requests cannot both observe the same state.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{
    ContactPoint, Identity, NewIdentity, NewVerificationCode, RefreshTokenRecord,
    VerificationCode,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No matching row, or the conditional update matched nothing.
    #[error("Record not found")]
    NotFound,

    /// Unique constraint violation.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::Conflict(db.constraint().unwrap_or("unique").to_string())
            }
            other => StoreError::Backend(other.to_string()),
        }
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Identity records and refresh sessions.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Persist a new identity and return it with its generated id.
    /// Duplicate email or phone yields [`StoreError::Conflict`].
    async fn create_identity(&self, identity: NewIdentity) -> StoreResult<Identity>;

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Identity>>;

    async fn find_by_phone(&self, phone: &str) -> StoreResult<Option<Identity>>;

    async fn find_by_id(&self, id: &str) -> StoreResult<Option<Identity>>;

    async fn count_by_email(&self, email: &str) -> StoreResult<i64>;

    async fn count_by_phone(&self, phone: &str) -> StoreResult<i64>;

    /// Replace an identity's mutable fields. [`StoreError::NotFound`] if absent.
    async fn update_identity(&self, identity: &Identity) -> StoreResult<()>;

    /// Hash `raw_token` and store it as a new session record.
    async fn save_refresh_token(
        &self,
        user_id: &str,
        raw_token: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<RefreshTokenRecord>;

    /// Look up a session by the hash of `raw_token`, whatever its state.
    async fn find_refresh_token(&self, raw_token: &str) -> StoreResult<Option<RefreshTokenRecord>>;

    /// Revoke the session for `raw_token` owned by `user_id`, only if it is
    /// currently unrevoked and unexpired. [`StoreError::NotFound`] otherwise.
    async fn find_and_revoke(&self, user_id: &str, raw_token: &str) -> StoreResult<()>;

    /// Atomically revoke the active session for `old_raw_token` and insert a
    /// session for `new_raw_token`. If the old session is not active nothing
    /// is written and [`StoreError::NotFound`] is returned.
    async fn rotate_refresh_token(
        &self,
        user_id: &str,
        old_raw_token: &str,
        new_raw_token: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<RefreshTokenRecord>;
}

/// One-time verification codes.
#[async_trait]
pub trait OtpStore: Send + Sync {
    async fn create_code(&self, code: NewVerificationCode) -> StoreResult<VerificationCode>;

    /// Most recently created code for `target` that is unused and unexpired at `now`.
    async fn latest_active_code(
        &self,
        target: &ContactPoint,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<VerificationCode>>;

    /// Flip `used` to true, only if it is currently false.
    /// [`StoreError::NotFound`] if the code is missing or already used.
    async fn mark_used(&self, code_id: &str) -> StoreResult<()>;

    /// Number of codes created for `target` since `since`.
    async fn recent_request_count(
        &self,
        target: &ContactPoint,
        since: DateTime<Utc>,
    ) -> StoreResult<i64>;

    /// Delete codes whose expiry is before `cutoff`. Returns the number removed.
    async fn delete_expired(&self, cutoff: DateTime<Utc>) -> StoreResult<u64>;
}
