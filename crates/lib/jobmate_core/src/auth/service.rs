//! Auth orchestrator: Register, Login, OAuthLogin, Logout and RefreshToken.
//!
//! Every check-then-set that another request could race on (consuming a
//! code, revoking or rotating a session) is a single conditional store call.
//! Each public operation runs under its own deadline from
//! [`OperationTimeouts`](crate::config::OperationTimeouts).

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use super::otp::verify_code;
use super::password::hash_password;
use super::validation::{choose_non_empty, is_strong_password, normalize_email, normalize_phone};
use super::{AuthError, PasswordHasher, TokenIssuer, with_deadline};
use crate::config::{AuthConfig, OperationTimeouts};
use crate::models::{
    ContactPoint, Credentials, Identity, LoginResult, NewAccount, NewIdentity, OAuthProfile,
    RefreshOutcome, TokenClaims, UserProfile,
};
use crate::store::{IdentityStore, OtpStore, StoreError};

/// Compared against when no identity matches, so a miss costs a bcrypt round too.
const DUMMY_PASSWORD: &str = "jobmate-dummy-password-1";

pub struct AuthService {
    identities: Arc<dyn IdentityStore>,
    otps: Arc<dyn OtpStore>,
    hasher: PasswordHasher,
    tokens: TokenIssuer,
    timeouts: OperationTimeouts,
    dummy_hash: String,
}

impl AuthService {
    pub fn new(
        config: &AuthConfig,
        identities: Arc<dyn IdentityStore>,
        otps: Arc<dyn OtpStore>,
    ) -> Result<Self, AuthError> {
        Ok(Self {
            identities,
            otps,
            hasher: PasswordHasher::new(config.bcrypt_cost),
            tokens: TokenIssuer::new(&config.tokens)?,
            timeouts: config.timeouts,
            dummy_hash: hash_password(DUMMY_PASSWORD, config.bcrypt_cost)?,
        })
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    // -------------------------------------------------------------------------
    // Register
    // -------------------------------------------------------------------------

    /// Create a verified identity.
    ///
    /// With `oauth` present the provider's attested email is used and no
    /// code is required; otherwise `input` must carry a strong password and
    /// an unused, unexpired code sent to its email. Names from `input` win
    /// over the provider's.
    pub async fn register(
        &self,
        input: Option<NewAccount>,
        oauth: Option<OAuthProfile>,
    ) -> Result<Identity, AuthError> {
        with_deadline(
            self.timeouts.register,
            "register",
            self.register_inner(input, oauth),
        )
        .await
    }

    async fn register_inner(
        &self,
        input: Option<NewAccount>,
        oauth: Option<OAuthProfile>,
    ) -> Result<Identity, AuthError> {
        if input.is_none() && oauth.is_none() {
            return Err(AuthError::InvalidInput("registration details are required".into()));
        }
        let input = input.unwrap_or_default();
        let (email, password_hash, phone) = match &oauth {
            Some(profile) => {
                let email = federated_email(profile)?;
                self.ensure_email_free(&email).await?;
                (email, None, None)
            }
            None => {
                if !is_strong_password(&input.password) {
                    return Err(AuthError::WeakPassword);
                }
                let email = normalize_email(&input.email)?;
                self.ensure_email_free(&email).await?;
                let phone = self.optional_phone(input.phone.as_deref()).await?;

                let code_id = self.check_registration_code(&email, &input.otp).await?;
                let hash = self.hasher.hash(&input.password).await?;
                self.otps.mark_used(&code_id).await.map_err(|e| {
                    warn!(code_id = %code_id, error = %e, "Verification code could not be consumed");
                    AuthError::OtpUseFailed
                })?;
                (email, Some(hash), phone)
            }
        };

        let oauth_first = oauth.as_ref().and_then(|p| p.first_name.as_deref());
        let oauth_last = oauth.as_ref().and_then(|p| p.last_name.as_deref());
        let new_identity = NewIdentity {
            email: Some(email),
            phone,
            password_hash,
            is_verified: true,
            provider: oauth
                .as_ref()
                .map(|p| p.provider.clone())
                .unwrap_or_default(),
            first_name: choose_non_empty(input.first_name.as_deref(), oauth_first),
            last_name: choose_non_empty(input.last_name.as_deref(), oauth_last),
            profile_picture: oauth
                .as_ref()
                .and_then(|p| p.picture.as_deref())
                .and_then(|p| choose_non_empty(Some(p), None)),
            preferred_language: input.preferred_language,
        };

        let identity = self
            .identities
            .create_identity(new_identity)
            .await
            .map_err(|e| match e {
                StoreError::Conflict(constraint) if constraint.contains("phone") => {
                    AuthError::PhoneAlreadyExists
                }
                StoreError::Conflict(_) => AuthError::EmailAlreadyExists,
                other => other.into(),
            })?;

        info!(
            user_id = %identity.id,
            provider = identity.provider.as_str(),
            "Identity registered"
        );
        Ok(identity)
    }

    async fn ensure_email_free(&self, email: &str) -> Result<(), AuthError> {
        if self.identities.count_by_email(email).await? > 0 {
            return Err(AuthError::EmailAlreadyExists);
        }
        Ok(())
    }

    /// Normalize and uniqueness-check a phone number, if one was given.
    async fn optional_phone(&self, phone: Option<&str>) -> Result<Option<String>, AuthError> {
        let Some(phone) = phone.filter(|p| !p.trim().is_empty()) else {
            return Ok(None);
        };
        let phone = normalize_phone(phone)?;
        if self.identities.count_by_phone(&phone).await? > 0 {
            return Err(AuthError::PhoneAlreadyExists);
        }
        Ok(Some(phone))
    }

    /// Find the newest usable code for `email` and check `presented` against
    /// it. Returns the code id so the caller can consume it.
    async fn check_registration_code(
        &self,
        email: &str,
        presented: &str,
    ) -> Result<String, AuthError> {
        if presented.trim().is_empty() {
            return Err(AuthError::InvalidInput("verification code is required".into()));
        }
        let target = ContactPoint::Email(email.to_string());
        let code = self
            .otps
            .latest_active_code(&target, Utc::now())
            .await?
            .ok_or(AuthError::InvalidOtp)?;
        verify_code(&self.hasher, &code, presented).await?;
        Ok(code.id)
    }

    // -------------------------------------------------------------------------
    // Login
    // -------------------------------------------------------------------------

    /// Authenticate with an email (or phone number) and password and open a
    /// new session. Existing sessions are left alone.
    pub async fn login(&self, credentials: Credentials) -> Result<LoginResult, AuthError> {
        with_deadline(self.timeouts.login, "login", self.login_inner(credentials)).await
    }

    async fn login_inner(&self, credentials: Credentials) -> Result<LoginResult, AuthError> {
        if credentials.identifier.trim().is_empty() || credentials.password.is_empty() {
            return Err(AuthError::InvalidInput(
                "identifier and password are required".into(),
            ));
        }

        let Some(identity) = self.resolve_identifier(&credentials.identifier).await? else {
            // Same bcrypt cost as a real mismatch.
            let _ = self.hasher.verify(&self.dummy_hash, &credentials.password).await;
            return Err(AuthError::InvalidCredentials);
        };

        if identity.is_federated() {
            return Err(AuthError::OAuthUserCannotLoginWithPassword);
        }
        if !identity.is_verified {
            return Err(AuthError::EmailNotVerified);
        }
        let matched = match identity.password_hash.as_deref() {
            Some(hash) => self.hasher.verify(hash, &credentials.password).await,
            None => {
                let _ = self.hasher.verify(&self.dummy_hash, &credentials.password).await;
                false
            }
        };
        if !matched {
            debug!(user_id = %identity.id, "Password mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        let result = self.open_session(&identity).await?;
        info!(user_id = %identity.id, "Login succeeded");
        Ok(result)
    }

    /// Email first; anything without an `@` is tried as a phone number.
    /// Malformed identifiers simply match nothing.
    async fn resolve_identifier(&self, identifier: &str) -> Result<Option<Identity>, AuthError> {
        let identifier = identifier.trim();
        if identifier.contains('@') {
            match normalize_email(identifier) {
                Ok(email) => Ok(self.identities.find_by_email(&email).await?),
                Err(_) => Ok(None),
            }
        } else {
            match normalize_phone(identifier) {
                Ok(phone) => Ok(self.identities.find_by_phone(&phone).await?),
                Err(_) => Ok(None),
            }
        }
    }

    // -------------------------------------------------------------------------
    // OAuthLogin
    // -------------------------------------------------------------------------

    /// Log in with a provider profile, provisioning the identity on first use.
    pub async fn oauth_login(&self, profile: OAuthProfile) -> Result<LoginResult, AuthError> {
        with_deadline(
            self.timeouts.oauth_login,
            "oauth_login",
            self.oauth_login_inner(profile),
        )
        .await
    }

    async fn oauth_login_inner(&self, profile: OAuthProfile) -> Result<LoginResult, AuthError> {
        let email = federated_email(&profile)?;

        let identity = match self.identities.find_by_email(&email).await? {
            Some(existing) => existing,
            None => match self.register_inner(None, Some(profile.clone())).await {
                Ok(created) => created,
                // A concurrent first login created it in the meantime.
                Err(AuthError::EmailAlreadyExists) => self
                    .identities
                    .find_by_email(&email)
                    .await?
                    .ok_or(AuthError::EmailAlreadyExists)?,
                Err(e) => return Err(e),
            },
        };

        if identity.provider != profile.provider {
            warn!(
                user_id = %identity.id,
                expected = identity.provider.as_str(),
                actual = profile.provider.as_str(),
                "OAuth provider mismatch"
            );
            return Err(AuthError::OAuthProviderMismatch {
                expected: identity.provider.clone(),
                actual: profile.provider.clone(),
            });
        }

        let result = self.open_session(&identity).await?;
        info!(
            user_id = %identity.id,
            provider = profile.provider.as_str(),
            "OAuth login succeeded"
        );
        Ok(result)
    }

    // -------------------------------------------------------------------------
    // Logout
    // -------------------------------------------------------------------------

    /// Revoke one presented session. Other sessions of the identity survive.
    ///
    /// A session that is unknown, foreign, expired or already revoked is
    /// reported as [`AuthError::DatabaseOperationFailed`].
    pub async fn logout(&self, identity_id: &str, refresh_token: &str) -> Result<(), AuthError> {
        with_deadline(
            self.timeouts.logout,
            "logout",
            self.logout_inner(identity_id, refresh_token),
        )
        .await
    }

    async fn logout_inner(&self, identity_id: &str, refresh_token: &str) -> Result<(), AuthError> {
        if identity_id.trim().is_empty() {
            return Err(AuthError::InvalidInput("identity id is required".into()));
        }
        match self
            .identities
            .find_and_revoke(identity_id, refresh_token)
            .await
        {
            Ok(()) => {
                info!(user_id = %identity_id, "Session revoked");
                Ok(())
            }
            Err(StoreError::NotFound) => Err(AuthError::DatabaseOperationFailed(
                "refresh session not found or no longer active".into(),
            )),
            Err(e) => Err(e.into()),
        }
    }

    // -------------------------------------------------------------------------
    // RefreshToken
    // -------------------------------------------------------------------------

    /// Exchange a refresh token for a new access token and a new refresh
    /// token. The presented token is revoked in the same store call that
    /// records its replacement, so it works exactly once.
    pub async fn refresh_token(&self, presented: &str) -> Result<RefreshOutcome, AuthError> {
        with_deadline(
            self.timeouts.refresh,
            "refresh_token",
            self.refresh_token_inner(presented),
        )
        .await
    }

    async fn refresh_token_inner(&self, presented: &str) -> Result<RefreshOutcome, AuthError> {
        if presented.trim().is_empty() {
            return Err(AuthError::InvalidInput("refresh token is required".into()));
        }

        let subject = self.tokens.validate_refresh_token(presented)?;
        let record = self
            .identities
            .find_refresh_token(presented)
            .await?
            .filter(|r| r.is_active_at(Utc::now()))
            .ok_or(AuthError::TokenVerificationFailed)?;
        if record.user_id != subject {
            return Err(AuthError::TokenVerificationFailed);
        }

        let identity = self
            .identities
            .find_by_id(&record.user_id)
            .await?
            .ok_or_else(|| {
                warn!(user_id = %record.user_id, "Refresh session has no owning identity");
                AuthError::DatabaseOperationFailed("refresh session owner missing".into())
            })?;

        let (access_token, expires_in) = self
            .tokens
            .issue_access_token(&identity.id, identity.locale())?;
        let refresh_token = self.tokens.issue_refresh_token(&identity.id)?;
        let session_ttl = self.tokens.refresh_session_ttl();

        match self
            .identities
            .rotate_refresh_token(
                &identity.id,
                presented,
                &refresh_token,
                Utc::now() + session_ttl,
            )
            .await
        {
            Ok(_) => {}
            // Lost the race to a concurrent refresh or logout.
            Err(StoreError::NotFound) => return Err(AuthError::TokenVerificationFailed),
            Err(e) => return Err(e.into()),
        }

        debug!(user_id = %identity.id, "Refresh token rotated");
        Ok(RefreshOutcome {
            access_token,
            refresh_token,
            expires_in,
            refresh_expires_in: session_ttl,
        })
    }

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    /// Verify an access token issued by this service.
    pub fn validate_access_token(&self, token: &str) -> Result<TokenClaims, AuthError> {
        self.tokens.validate_access_token(token)
    }

    /// Sanitized profile for an identity id.
    pub async fn find_identity(&self, identity_id: &str) -> Result<UserProfile, AuthError> {
        self.identities
            .find_by_id(identity_id)
            .await?
            .map(|identity| identity.profile())
            .ok_or(AuthError::UserNotFound)
    }

    /// Issue access and refresh tokens and persist the refresh session.
    async fn open_session(&self, identity: &Identity) -> Result<LoginResult, AuthError> {
        let (access_token, expires_in) = self
            .tokens
            .issue_access_token(&identity.id, identity.locale())?;
        let refresh_token = self.tokens.issue_refresh_token(&identity.id)?;
        let session_ttl = self.tokens.refresh_session_ttl();
        self.identities
            .save_refresh_token(&identity.id, &refresh_token, Utc::now() + session_ttl)
            .await?;
        Ok(LoginResult {
            access_token,
            refresh_token,
            expires_in,
            refresh_expires_in: session_ttl,
            user: identity.profile(),
        })
    }
}

/// The provider-attested email of a profile, normalized.
fn federated_email(profile: &OAuthProfile) -> Result<String, AuthError> {
    if profile.provider.trim().is_empty() || !profile.email_verified {
        return Err(AuthError::InvalidOAuthUserData);
    }
    let email = profile
        .email
        .as_deref()
        .filter(|e| !e.trim().is_empty())
        .ok_or(AuthError::InvalidOAuthUserData)?;
    normalize_email(email).map_err(|_| AuthError::InvalidOAuthUserData)
}
