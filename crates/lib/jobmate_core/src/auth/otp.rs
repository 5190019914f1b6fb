//! One-time verification codes: generation, hashing, delivery and expiry.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rand::Rng;
use tracing::{debug, info, warn};

use super::validation::{normalize_email, normalize_phone};
use super::{AuthError, PasswordHasher, with_deadline};
use crate::config::{AuthConfig, OtpPolicy};
use crate::models::{ContactPoint, NewVerificationCode, OtpPurpose, OtpRequest, VerificationCode};
use crate::notify::{Notifier, registration_message};
use crate::store::OtpStore;

/// Generate a numeric code of exactly `length` digits (leading zeros kept).
pub fn generate_code(length: usize) -> String {
    let mut rng = rand::rng();
    (0..length)
        .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
        .collect()
}

/// Check a presented code against a stored one.
///
/// A used or expired record fails with [`AuthError::OtpExpired`] even when
/// the code matches; a mismatch fails with [`AuthError::InvalidOtp`].
pub async fn verify_code(
    hasher: &PasswordHasher,
    stored: &VerificationCode,
    presented: &str,
) -> Result<(), AuthError> {
    if stored.used || stored.is_expired_at(Utc::now()) {
        return Err(AuthError::OtpExpired);
    }
    if !hasher.verify(&stored.code_hash, presented.trim()).await {
        return Err(AuthError::InvalidOtp);
    }
    Ok(())
}

/// Issues registration codes and keeps the code table tidy.
pub struct OtpService {
    store: Arc<dyn OtpStore>,
    notifier: Arc<dyn Notifier>,
    hasher: PasswordHasher,
    policy: OtpPolicy,
    timeout: Duration,
}

impl OtpService {
    pub fn new(config: &AuthConfig, store: Arc<dyn OtpStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            store,
            notifier,
            hasher: PasswordHasher::new(config.bcrypt_cost),
            policy: config.otp,
            timeout: config.timeouts.otp_request,
        }
    }

    pub fn policy(&self) -> &OtpPolicy {
        &self.policy
    }

    /// Create a registration code for the requested email and deliver it.
    ///
    /// Succeeds whether or not delivery worked; only malformed input, the
    /// rate limit, hashing and persistence failures are reported.
    pub async fn request_otp(&self, request: OtpRequest) -> Result<(), AuthError> {
        with_deadline(self.timeout, "request_otp", self.request_otp_inner(request)).await
    }

    async fn request_otp_inner(&self, request: OtpRequest) -> Result<(), AuthError> {
        let email = normalize_email(&request.email)?;
        let phone = request
            .phone
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .map(normalize_phone)
            .transpose()?;

        let mut targets = vec![ContactPoint::Email(email.clone())];
        if let Some(phone) = &phone {
            targets.push(ContactPoint::Phone(phone.clone()));
        }
        for target in &targets {
            self.enforce_rate_limit(target).await?;
        }

        let code = generate_code(self.policy.length);
        let code_hash = self.hasher.hash(&code).await?;
        let expires_at = Utc::now() + self.policy.expiry;

        let stored = self
            .store
            .create_code(NewVerificationCode {
                user_id: None,
                email: Some(email.clone()),
                phone,
                code_hash,
                purpose: OtpPurpose::Registration,
                expires_at,
            })
            .await?;
        debug!(
            code_id = %stored.id,
            requestor_ip = request.requestor_ip.as_deref().unwrap_or("-"),
            "Verification code stored"
        );

        let (subject, body) = registration_message(&code, self.policy.expiry.as_secs() / 60);
        let destination = ContactPoint::Email(email);
        if let Err(e) = self.notifier.send(&destination, &subject, &body).await {
            warn!(destination = %destination, error = %e, "Verification code delivery failed");
        }
        Ok(())
    }

    /// Reject once `target` has reached the request ceiling for the window.
    /// A failed count skips the check instead of blocking issuance.
    async fn enforce_rate_limit(&self, target: &ContactPoint) -> Result<(), AuthError> {
        let since = Utc::now() - self.policy.rate_limit_window;
        match self.store.recent_request_count(target, since).await {
            Ok(count) if count >= self.policy.rate_limit_count => {
                info!(target = %target, count, "Verification code rate limit reached");
                Err(AuthError::RateLimited)
            }
            Ok(_) => Ok(()),
            Err(e) => {
                warn!(target = %target, error = %e, "Rate limit lookup failed, not throttling");
                Ok(())
            }
        }
    }

    /// Delete codes that expired before the current rate-limit window
    /// opened. Returns the number removed.
    ///
    /// Codes still inside the window are kept even when expired, since they
    /// count towards the request ceiling.
    pub async fn purge_expired(&self) -> Result<u64, AuthError> {
        let cutoff = Utc::now() - self.policy.rate_limit_window;
        Ok(self.store.delete_expired(cutoff).await?)
    }

    /// Spawn a task that purges expired codes every `every`.
    pub fn spawn_cleanup_task(self: &Arc<Self>, every: Duration) -> tokio::task::JoinHandle<()> {
        let service = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                match service.purge_expired().await {
                    Ok(0) => {}
                    Ok(removed) => debug!(removed, "Purged expired verification codes"),
                    Err(e) => warn!(error = %e, "Verification code purge failed"),
                }
            }
        })
    }
}
