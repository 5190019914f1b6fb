//! In-memory storage implementation.
//!
//! Each conditional update happens inside a single critical section, which
//! gives the same exactly-one-winner behaviour as the SQL implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use super::{IdentityStore, OtpStore, StoreError, StoreResult};
use crate::auth::jwt::hash_token;
use crate::models::{
    ContactPoint, Identity, NewIdentity, NewVerificationCode, RefreshTokenRecord,
    VerificationCode,
};
use crate::uuid::new_id;

#[derive(Default)]
struct Tables {
    identities: HashMap<String, Identity>,
    /// Keyed by token hash.
    refresh_tokens: HashMap<String, RefreshTokenRecord>,
    codes: Vec<VerificationCode>,
}

/// In-memory identity, session and code store.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored session records for a user (for tests and diagnostics).
    pub async fn refresh_token_count(&self, user_id: &str) -> usize {
        let tables = self.tables.lock().await;
        tables
            .refresh_tokens
            .values()
            .filter(|t| t.user_id == user_id)
            .count()
    }

    /// Override a session's expiry (for tests).
    pub async fn set_refresh_token_expiry(
        &self,
        raw_token: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut tables = self.tables.lock().await;
        let record = tables
            .refresh_tokens
            .get_mut(&hash_token(raw_token))
            .ok_or(StoreError::NotFound)?;
        record.expires_at = expires_at;
        Ok(())
    }

    /// Override the expiry of every code for a contact point (for tests).
    pub async fn set_code_expiry(&self, target: &ContactPoint, expires_at: DateTime<Utc>) {
        let mut tables = self.tables.lock().await;
        for code in tables.codes.iter_mut().filter(|c| matches_target(c, target)) {
            code.expires_at = expires_at;
        }
    }
}

fn matches_target(code: &VerificationCode, target: &ContactPoint) -> bool {
    match target {
        ContactPoint::Email(email) => code.email.as_deref() == Some(email.as_str()),
        ContactPoint::Phone(phone) => code.phone.as_deref() == Some(phone.as_str()),
    }
}

fn new_session(user_id: &str, raw_token: &str, expires_at: DateTime<Utc>) -> RefreshTokenRecord {
    RefreshTokenRecord {
        id: new_id(),
        user_id: user_id.to_string(),
        token_hash: hash_token(raw_token),
        revoked: false,
        expires_at,
        created_at: Utc::now(),
    }
}

#[async_trait]
impl IdentityStore for MemoryStore {
    async fn create_identity(&self, identity: NewIdentity) -> StoreResult<Identity> {
        let mut tables = self.tables.lock().await;
        for existing in tables.identities.values() {
            if identity.email.is_some() && existing.email == identity.email {
                return Err(StoreError::Conflict("identities_email_key".into()));
            }
            if identity.phone.is_some() && existing.phone == identity.phone {
                return Err(StoreError::Conflict("identities_phone_key".into()));
            }
        }
        let now = Utc::now();
        let created = Identity {
            id: new_id(),
            email: identity.email,
            phone: identity.phone,
            password_hash: identity.password_hash,
            is_verified: identity.is_verified,
            provider: identity.provider,
            first_name: identity.first_name,
            last_name: identity.last_name,
            profile_picture: identity.profile_picture,
            preferred_language: identity.preferred_language,
            created_at: now,
            updated_at: now,
        };
        tables.identities.insert(created.id.clone(), created.clone());
        Ok(created)
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Identity>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .identities
            .values()
            .find(|i| i.email.as_deref() == Some(email))
            .cloned())
    }

    async fn find_by_phone(&self, phone: &str) -> StoreResult<Option<Identity>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .identities
            .values()
            .find(|i| i.phone.as_deref() == Some(phone))
            .cloned())
    }

    async fn find_by_id(&self, id: &str) -> StoreResult<Option<Identity>> {
        Ok(self.tables.lock().await.identities.get(id).cloned())
    }

    async fn count_by_email(&self, email: &str) -> StoreResult<i64> {
        let tables = self.tables.lock().await;
        let count = tables
            .identities
            .values()
            .filter(|i| i.email.as_deref() == Some(email))
            .count();
        Ok(count as i64)
    }

    async fn count_by_phone(&self, phone: &str) -> StoreResult<i64> {
        let tables = self.tables.lock().await;
        let count = tables
            .identities
            .values()
            .filter(|i| i.phone.as_deref() == Some(phone))
            .count();
        Ok(count as i64)
    }

    async fn update_identity(&self, identity: &Identity) -> StoreResult<()> {
        let mut tables = self.tables.lock().await;
        let existing = tables
            .identities
            .get_mut(&identity.id)
            .ok_or(StoreError::NotFound)?;
        *existing = Identity {
            created_at: existing.created_at,
            updated_at: Utc::now(),
            ..identity.clone()
        };
        Ok(())
    }

    async fn save_refresh_token(
        &self,
        user_id: &str,
        raw_token: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<RefreshTokenRecord> {
        let record = new_session(user_id, raw_token, expires_at);
        let mut tables = self.tables.lock().await;
        if tables.refresh_tokens.contains_key(&record.token_hash) {
            return Err(StoreError::Conflict("refresh_tokens_token_hash_key".into()));
        }
        tables
            .refresh_tokens
            .insert(record.token_hash.clone(), record.clone());
        Ok(record)
    }

    async fn find_refresh_token(&self, raw_token: &str) -> StoreResult<Option<RefreshTokenRecord>> {
        let tables = self.tables.lock().await;
        Ok(tables.refresh_tokens.get(&hash_token(raw_token)).cloned())
    }

    async fn find_and_revoke(&self, user_id: &str, raw_token: &str) -> StoreResult<()> {
        let now = Utc::now();
        let mut tables = self.tables.lock().await;
        match tables.refresh_tokens.get_mut(&hash_token(raw_token)) {
            Some(record) if record.user_id == user_id && record.is_active_at(now) => {
                record.revoked = true;
                Ok(())
            }
            _ => Err(StoreError::NotFound),
        }
    }

    async fn rotate_refresh_token(
        &self,
        user_id: &str,
        old_raw_token: &str,
        new_raw_token: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<RefreshTokenRecord> {
        let now = Utc::now();
        let replacement = new_session(user_id, new_raw_token, expires_at);
        let mut tables = self.tables.lock().await;
        if tables.refresh_tokens.contains_key(&replacement.token_hash) {
            return Err(StoreError::Conflict("refresh_tokens_token_hash_key".into()));
        }
        match tables.refresh_tokens.get_mut(&hash_token(old_raw_token)) {
            Some(record) if record.user_id == user_id && record.is_active_at(now) => {
                record.revoked = true;
            }
            _ => return Err(StoreError::NotFound),
        }
        tables
            .refresh_tokens
            .insert(replacement.token_hash.clone(), replacement.clone());
        Ok(replacement)
    }
}

#[async_trait]
impl OtpStore for MemoryStore {
    async fn create_code(&self, code: NewVerificationCode) -> StoreResult<VerificationCode> {
        let created = VerificationCode {
            id: new_id(),
            user_id: code.user_id,
            email: code.email,
            phone: code.phone,
            code_hash: code.code_hash,
            purpose: code.purpose,
            expires_at: code.expires_at,
            used: false,
            created_at: Utc::now(),
        };
        self.tables.lock().await.codes.push(created.clone());
        Ok(created)
    }

    async fn latest_active_code(
        &self,
        target: &ContactPoint,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<VerificationCode>> {
        let tables = self.tables.lock().await;
        // Codes are appended in creation order, so the last match is the newest.
        Ok(tables
            .codes
            .iter()
            .rev()
            .find(|c| matches_target(c, target) && !c.used && !c.is_expired_at(now))
            .cloned())
    }

    async fn mark_used(&self, code_id: &str) -> StoreResult<()> {
        let mut tables = self.tables.lock().await;
        match tables.codes.iter_mut().find(|c| c.id == code_id) {
            Some(code) if !code.used => {
                code.used = true;
                Ok(())
            }
            _ => Err(StoreError::NotFound),
        }
    }

    async fn recent_request_count(
        &self,
        target: &ContactPoint,
        since: DateTime<Utc>,
    ) -> StoreResult<i64> {
        let tables = self.tables.lock().await;
        let count = tables
            .codes
            .iter()
            .filter(|c| matches_target(c, target) && c.created_at >= since)
            .count();
        Ok(count as i64)
    }

    async fn delete_expired(&self, cutoff: DateTime<Utc>) -> StoreResult<u64> {
        let mut tables = self.tables.lock().await;
        let before = tables.codes.len();
        tables.codes.retain(|c| !c.is_expired_at(cutoff));
        Ok((before - tables.codes.len()) as u64)
    }
}
