//! JWT token issuing and verification.
//!
//! Access and refresh tokens are HS256-signed with distinct secrets, so a
//! leaked access secret cannot mint refresh tokens and vice versa. Tokens
//! signed with any other algorithm are rejected.

use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::distr::Alphanumeric;
use rand::{Rng, rng};
use serde::Serialize;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use super::AuthError;
use crate::config::TokenConfig;
use crate::models::{Locale, RefreshClaims, TokenClaims};

const ALGORITHM: Algorithm = Algorithm::HS256;

/// Longest lifetime accepted for any token or session.
pub const MAX_TOKEN_TTL: Duration = Duration::from_secs(10 * 365 * 24 * 60 * 60);

/// Issues and validates signed access and refresh tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    access_ttl: Duration,
    refresh_signature_ttl: Duration,
    refresh_session_ttl: Duration,
}

impl TokenIssuer {
    /// Build an issuer from config. Secrets must be non-empty and distinct.
    pub fn new(config: &TokenConfig) -> Result<Self, AuthError> {
        if config.access_secret.is_empty() || config.refresh_secret.is_empty() {
            return Err(AuthError::InvalidInput("signing secrets must not be empty".into()));
        }
        if config.access_secret == config.refresh_secret {
            return Err(AuthError::InvalidInput(
                "access and refresh secrets must differ".into(),
            ));
        }
        let ttls = [
            config.access_ttl,
            config.refresh_signature_ttl,
            config.refresh_session_ttl,
        ];
        if ttls.iter().any(|ttl| ttl.is_zero() || *ttl > MAX_TOKEN_TTL) {
            return Err(AuthError::InvalidInput(
                "token lifetimes must be positive and at most ten years".into(),
            ));
        }
        Ok(Self {
            access_encoding: EncodingKey::from_secret(config.access_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(config.access_secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(config.refresh_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(config.refresh_secret.as_bytes()),
            access_ttl: config.access_ttl,
            refresh_signature_ttl: config.refresh_signature_ttl,
            refresh_session_ttl: config.refresh_session_ttl,
        })
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    /// Lifetime of a stored refresh session record.
    pub fn refresh_session_ttl(&self) -> Duration {
        self.refresh_session_ttl
    }

    /// Generate a signed access token. Returns the token and its TTL.
    pub fn issue_access_token(
        &self,
        subject: &str,
        locale: Locale,
    ) -> Result<(String, Duration), AuthError> {
        let now = Utc::now().timestamp();
        let claims = TokenClaims {
            sub: subject.to_string(),
            lang: locale.as_str().to_string(),
            iat: now,
            exp: now + ttl_secs(self.access_ttl),
        };
        let token = sign(&claims, &self.access_encoding)?;
        Ok((token, self.access_ttl))
    }

    /// Generate a signed refresh token.
    pub fn issue_refresh_token(&self, subject: &str) -> Result<String, AuthError> {
        let now = Utc::now().timestamp();
        let claims = RefreshClaims {
            sub: subject.to_string(),
            jti: uuid::Uuid::new_v4().to_string(),
            iat: now,
            exp: now + ttl_secs(self.refresh_signature_ttl),
        };
        sign(&claims, &self.refresh_encoding)
    }

    /// Verify an access token, returning its claims.
    pub fn validate_access_token(&self, token: &str) -> Result<TokenClaims, AuthError> {
        let claims: TokenClaims = verify(token, &self.access_decoding)?;
        if claims.sub.is_empty() || Locale::parse(&claims.lang).is_none() {
            return Err(AuthError::TokenVerificationFailed);
        }
        Ok(claims)
    }

    /// Verify a refresh token's signature and expiry, returning the subject.
    ///
    /// Does not consult the session store.
    pub fn validate_refresh_token(&self, token: &str) -> Result<String, AuthError> {
        let claims: RefreshClaims = verify(token, &self.refresh_decoding)?;
        if claims.sub.is_empty() {
            return Err(AuthError::TokenVerificationFailed);
        }
        Ok(claims.sub)
    }
}

fn ttl_secs(ttl: Duration) -> i64 {
    i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX)
}

fn sign<T: Serialize>(claims: &T, key: &EncodingKey) -> Result<String, AuthError> {
    encode(&Header::new(ALGORITHM), claims, key)
        .map_err(|e| AuthError::TokenGenerationFailed(format!("jwt encode: {e}")))
}

fn verify<T: DeserializeOwned>(token: &str, key: &DecodingKey) -> Result<T, AuthError> {
    let mut validation = Validation::new(ALGORITHM);
    validation.leeway = 0;
    validation.validate_exp = true;
    validation.set_required_spec_claims(&["exp", "sub"]);
    decode::<T>(token, key, &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            debug!(error = %e, "jwt rejected");
            AuthError::TokenVerificationFailed
        })
}

/// SHA-256 hash a refresh token for storage.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Resolve a signing secret: the first non-empty env var in `env_keys`, else
/// a persisted file under the data dir, else a freshly generated secret that
/// is written to that file.
pub fn resolve_secret(env_keys: &[&str], file_name: &str) -> String {
    for key in env_keys {
        if let Ok(secret) = std::env::var(key)
            && !secret.is_empty()
        {
            return secret;
        }
    }
    let secret_path = secret_path(file_name);
    if let Ok(existing) = std::fs::read_to_string(&secret_path) {
        let trimmed = existing.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }
    let secret: String = rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect();
    if let Some(parent) = secret_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let _ = std::fs::write(&secret_path, &secret);
    info!(path = %secret_path.display(), "generated new signing secret");
    secret
}

fn secret_path(file_name: &str) -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("jobmate")
        .join(file_name)
}
