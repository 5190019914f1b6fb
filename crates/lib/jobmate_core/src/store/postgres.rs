//! PostgreSQL storage implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{IdentityStore, OtpStore, StoreError, StoreResult};
use crate::auth::jwt::hash_token;
use crate::models::{
    ContactPoint, Identity, Locale, NewIdentity, NewVerificationCode, OtpPurpose,
    RefreshTokenRecord, VerificationCode,
};
use crate::uuid::uuidv7;

macro_rules! select_identity {
    ($tail:literal) => {
        concat!(
            "SELECT id::text AS id, email, phone, password_hash, is_verified, provider, \
             first_name, last_name, profile_picture, preferred_language, created_at, updated_at \
             FROM identities ",
            $tail
        )
    };
}

const REFRESH_RETURNING: &str =
    "RETURNING id::text AS id, user_id::text AS user_id, token_hash, revoked, expires_at, created_at";

const CODE_COLUMNS: &str = "id::text AS id, user_id::text AS user_id, email, phone, code_hash, \
                            purpose, expires_at, used, created_at";

#[derive(sqlx::FromRow)]
struct IdentityRow {
    id: String,
    email: Option<String>,
    phone: Option<String>,
    password_hash: Option<String>,
    is_verified: bool,
    provider: String,
    first_name: Option<String>,
    last_name: Option<String>,
    profile_picture: Option<String>,
    preferred_language: Option<Locale>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<IdentityRow> for Identity {
    fn from(row: IdentityRow) -> Self {
        Identity {
            id: row.id,
            email: row.email,
            phone: row.phone,
            password_hash: row.password_hash,
            is_verified: row.is_verified,
            provider: row.provider,
            first_name: row.first_name,
            last_name: row.last_name,
            profile_picture: row.profile_picture,
            preferred_language: row.preferred_language,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct RefreshTokenRow {
    id: String,
    user_id: String,
    token_hash: String,
    revoked: bool,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl From<RefreshTokenRow> for RefreshTokenRecord {
    fn from(row: RefreshTokenRow) -> Self {
        RefreshTokenRecord {
            id: row.id,
            user_id: row.user_id,
            token_hash: row.token_hash,
            revoked: row.revoked,
            expires_at: row.expires_at,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct VerificationCodeRow {
    id: String,
    user_id: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    code_hash: String,
    purpose: OtpPurpose,
    expires_at: DateTime<Utc>,
    used: bool,
    created_at: DateTime<Utc>,
}

impl From<VerificationCodeRow> for VerificationCode {
    fn from(row: VerificationCodeRow) -> Self {
        VerificationCode {
            id: row.id,
            user_id: row.user_id,
            email: row.email,
            phone: row.phone,
            code_hash: row.code_hash,
            purpose: row.purpose,
            expires_at: row.expires_at,
            used: row.used,
            created_at: row.created_at,
        }
    }
}

/// Identifiers that are not UUIDs cannot match any row.
fn parse_id(id: &str) -> Option<Uuid> {
    Uuid::parse_str(id).ok()
}

/// Column name and value used to filter codes by contact point.
fn contact_filter(target: &ContactPoint) -> (&'static str, &str) {
    match target {
        ContactPoint::Email(email) => ("email", email.as_str()),
        ContactPoint::Phone(phone) => ("phone", phone.as_str()),
    }
}

/// PostgreSQL-backed identity, session and code store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl IdentityStore for PgStore {
    async fn create_identity(&self, identity: NewIdentity) -> StoreResult<Identity> {
        let row = sqlx::query_as::<_, IdentityRow>(
            "INSERT INTO identities \
             (id, email, phone, password_hash, is_verified, provider, \
              first_name, last_name, profile_picture, preferred_language) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING id::text AS id, email, phone, password_hash, is_verified, provider, \
             first_name, last_name, profile_picture, preferred_language, created_at, updated_at",
        )
        .bind(uuidv7())
        .bind(&identity.email)
        .bind(&identity.phone)
        .bind(&identity.password_hash)
        .bind(identity.is_verified)
        .bind(&identity.provider)
        .bind(&identity.first_name)
        .bind(&identity.last_name)
        .bind(&identity.profile_picture)
        .bind(identity.preferred_language)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Identity>> {
        let row = sqlx::query_as::<_, IdentityRow>(select_identity!("WHERE email = $1"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Identity::from))
    }

    async fn find_by_phone(&self, phone: &str) -> StoreResult<Option<Identity>> {
        let row = sqlx::query_as::<_, IdentityRow>(select_identity!("WHERE phone = $1"))
            .bind(phone)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Identity::from))
    }

    async fn find_by_id(&self, id: &str) -> StoreResult<Option<Identity>> {
        let Some(id) = parse_id(id) else {
            return Ok(None);
        };
        let row = sqlx::query_as::<_, IdentityRow>(select_identity!("WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Identity::from))
    }

    async fn count_by_email(&self, email: &str) -> StoreResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM identities WHERE email = $1")
            .bind(email)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn count_by_phone(&self, phone: &str) -> StoreResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM identities WHERE phone = $1")
            .bind(phone)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn update_identity(&self, identity: &Identity) -> StoreResult<()> {
        let id = parse_id(&identity.id).ok_or(StoreError::NotFound)?;
        let result = sqlx::query(
            "UPDATE identities SET \
             email = $2, phone = $3, password_hash = $4, is_verified = $5, provider = $6, \
             first_name = $7, last_name = $8, profile_picture = $9, preferred_language = $10, \
             updated_at = now() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(&identity.email)
        .bind(&identity.phone)
        .bind(&identity.password_hash)
        .bind(identity.is_verified)
        .bind(&identity.provider)
        .bind(&identity.first_name)
        .bind(&identity.last_name)
        .bind(&identity.profile_picture)
        .bind(identity.preferred_language)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn save_refresh_token(
        &self,
        user_id: &str,
        raw_token: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<RefreshTokenRecord> {
        let user_id = parse_id(user_id).ok_or(StoreError::NotFound)?;
        let row = sqlx::query_as::<_, RefreshTokenRow>(&format!(
            "INSERT INTO refresh_tokens (id, user_id, token_hash, expires_at) \
             VALUES ($1, $2, $3, $4) {REFRESH_RETURNING}"
        ))
        .bind(uuidv7())
        .bind(user_id)
        .bind(hash_token(raw_token))
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn find_refresh_token(&self, raw_token: &str) -> StoreResult<Option<RefreshTokenRecord>> {
        let row = sqlx::query_as::<_, RefreshTokenRow>(
            "SELECT id::text AS id, user_id::text AS user_id, token_hash, revoked, \
             expires_at, created_at \
             FROM refresh_tokens WHERE token_hash = $1",
        )
        .bind(hash_token(raw_token))
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(RefreshTokenRecord::from))
    }

    async fn find_and_revoke(&self, user_id: &str, raw_token: &str) -> StoreResult<()> {
        let user_id = parse_id(user_id).ok_or(StoreError::NotFound)?;
        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked = TRUE \
             WHERE user_id = $1 AND token_hash = $2 \
               AND revoked = FALSE AND expires_at > now()",
        )
        .bind(user_id)
        .bind(hash_token(raw_token))
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn rotate_refresh_token(
        &self,
        user_id: &str,
        old_raw_token: &str,
        new_raw_token: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<RefreshTokenRecord> {
        let user_id = parse_id(user_id).ok_or(StoreError::NotFound)?;
        let mut tx = self.pool.begin().await?;

        let revoked = sqlx::query(
            "UPDATE refresh_tokens SET revoked = TRUE \
             WHERE user_id = $1 AND token_hash = $2 \
               AND revoked = FALSE AND expires_at > now()",
        )
        .bind(user_id)
        .bind(hash_token(old_raw_token))
        .execute(&mut *tx)
        .await?;
        if revoked.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(StoreError::NotFound);
        }

        let row = sqlx::query_as::<_, RefreshTokenRow>(&format!(
            "INSERT INTO refresh_tokens (id, user_id, token_hash, expires_at) \
             VALUES ($1, $2, $3, $4) {REFRESH_RETURNING}"
        ))
        .bind(uuidv7())
        .bind(user_id)
        .bind(hash_token(new_raw_token))
        .bind(expires_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(row.into())
    }
}

#[async_trait]
impl OtpStore for PgStore {
    async fn create_code(&self, code: NewVerificationCode) -> StoreResult<VerificationCode> {
        let user_id = code.user_id.as_deref().and_then(parse_id);
        let row = sqlx::query_as::<_, VerificationCodeRow>(&format!(
            "INSERT INTO verification_codes \
             (id, user_id, email, phone, code_hash, purpose, expires_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {CODE_COLUMNS}"
        ))
        .bind(uuidv7())
        .bind(user_id)
        .bind(&code.email)
        .bind(&code.phone)
        .bind(&code.code_hash)
        .bind(code.purpose)
        .bind(code.expires_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn latest_active_code(
        &self,
        target: &ContactPoint,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<VerificationCode>> {
        let (column, value) = contact_filter(target);
        let row = sqlx::query_as::<_, VerificationCodeRow>(&format!(
            "SELECT {CODE_COLUMNS} FROM verification_codes \
             WHERE {column} = $1 AND used = FALSE AND expires_at > $2 \
             ORDER BY created_at DESC LIMIT 1"
        ))
        .bind(value)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(VerificationCode::from))
    }

    async fn mark_used(&self, code_id: &str) -> StoreResult<()> {
        let id = parse_id(code_id).ok_or(StoreError::NotFound)?;
        let result =
            sqlx::query("UPDATE verification_codes SET used = TRUE WHERE id = $1 AND used = FALSE")
                .bind(id)
                .execute(&self.pool)
                .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn recent_request_count(
        &self,
        target: &ContactPoint,
        since: DateTime<Utc>,
    ) -> StoreResult<i64> {
        let (column, value) = contact_filter(target);
        let count = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM verification_codes WHERE {column} = $1 AND created_at >= $2"
        ))
        .bind(value)
        .bind(since)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn delete_expired(&self, cutoff: DateTime<Utc>) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM verification_codes WHERE expires_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
