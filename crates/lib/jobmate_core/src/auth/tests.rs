use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::password::hash_password;
use super::{AuthError, AuthService, with_deadline};
use crate::config::{AuthConfig, TokenConfig};
use crate::models::{
    ContactPoint, Credentials, Identity, Locale, NewAccount, NewIdentity, NewVerificationCode,
    OAuthProfile, OtpPurpose, RefreshTokenRecord,
};
use crate::store::{IdentityStore, MemoryStore, OtpStore, StoreResult};

const CODE: &str = "123456";
const PASSWORD: &str = "abc12345";

struct Fixture {
    store: Arc<MemoryStore>,
    service: AuthService,
}

fn config() -> AuthConfig {
    let mut config = AuthConfig::new(TokenConfig::new("access-secret", "refresh-secret"));
    config.bcrypt_cost = 4;
    config
}

fn fixture() -> Fixture {
    let store = Arc::new(MemoryStore::new());
    let service = AuthService::new(&config(), store.clone(), store.clone()).unwrap();
    Fixture { store, service }
}

async fn seed_code(store: &MemoryStore, email: &str, code: &str) {
    store
        .create_code(NewVerificationCode {
            user_id: None,
            email: Some(email.into()),
            phone: None,
            code_hash: hash_password(code, 4).unwrap(),
            purpose: OtpPurpose::Registration,
            expires_at: Utc::now() + chrono::Duration::minutes(5),
        })
        .await
        .unwrap();
}

fn account(email: &str) -> NewAccount {
    NewAccount {
        email: email.into(),
        password: PASSWORD.into(),
        otp: CODE.into(),
        ..Default::default()
    }
}

fn credentials(identifier: &str, password: &str) -> Credentials {
    Credentials {
        identifier: identifier.into(),
        password: password.into(),
    }
}

fn google_profile(email: &str) -> OAuthProfile {
    OAuthProfile {
        provider: "google".into(),
        subject: "g-1".into(),
        email: Some(email.into()),
        email_verified: true,
        first_name: Some("Abebe".into()),
        last_name: Some("Kebede".into()),
        picture: Some("https://example.com/p.png".into()),
    }
}

async fn register_local(f: &Fixture, email: &str) -> Identity {
    seed_code(&f.store, email, CODE).await;
    f.service.register(Some(account(email)), None).await.unwrap()
}

// =============================================================================
// Register
// =============================================================================

#[tokio::test]
async fn register_creates_verified_identity_without_exposing_password() {
    let f = fixture();
    let identity = register_local(&f, "a@x.com").await;

    assert!(!identity.id.is_empty());
    assert!(identity.is_verified);
    assert_eq!(identity.provider, "");
    let hash = identity.password_hash.clone().unwrap();
    assert_ne!(hash, PASSWORD);

    let json = serde_json::to_string(&identity.profile()).unwrap();
    assert!(!json.contains(PASSWORD));
    assert!(!json.contains(&hash));
    assert!(!json.to_lowercase().contains("password"));
    assert!(!format!("{identity:?}").contains(&hash));
}

#[tokio::test]
async fn register_same_email_twice_fails() {
    let f = fixture();
    register_local(&f, "a@x.com").await;

    seed_code(&f.store, "a@x.com", CODE).await;
    let err = f
        .service
        .register(Some(account("a@x.com")), None)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::EmailAlreadyExists));
}

#[tokio::test]
async fn weak_password_is_rejected_before_anything_is_written() {
    let f = fixture();
    seed_code(&f.store, "a@x.com", CODE).await;
    let mut input = account("a@x.com");
    input.password = "abcdefgh".into();

    let err = f.service.register(Some(input), None).await.unwrap_err();
    assert!(matches!(err, AuthError::WeakPassword));
    assert_eq!(f.store.count_by_email("a@x.com").await.unwrap(), 0);
    // The code is still usable.
    let target = ContactPoint::Email("a@x.com".into());
    assert!(
        f.store
            .latest_active_code(&target, Utc::now())
            .await
            .unwrap()
            .is_some()
    );
}

#[tokio::test]
async fn malformed_email_is_rejected() {
    let f = fixture();
    let err = f
        .service
        .register(Some(account("not-an-email")), None)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidEmailFormat));
}

#[tokio::test]
async fn register_requires_some_input() {
    let f = fixture();
    let err = f.service.register(None, None).await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidInput(_)));
}

#[tokio::test]
async fn wrong_or_missing_code_is_rejected() {
    let f = fixture();

    let err = f
        .service
        .register(Some(account("a@x.com")), None)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidOtp));

    seed_code(&f.store, "a@x.com", "654321").await;
    let err = f
        .service
        .register(Some(account("a@x.com")), None)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidOtp));

    let mut input = account("a@x.com");
    input.otp = String::new();
    let err = f.service.register(Some(input), None).await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidInput(_)));

    assert_eq!(f.store.count_by_email("a@x.com").await.unwrap(), 0);
}

#[tokio::test]
async fn expired_code_is_rejected() {
    let f = fixture();
    seed_code(&f.store, "a@x.com", CODE).await;
    let target = ContactPoint::Email("a@x.com".into());
    f.store
        .set_code_expiry(&target, Utc::now() - chrono::Duration::seconds(1))
        .await;

    let err = f
        .service
        .register(Some(account("a@x.com")), None)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidOtp | AuthError::OtpExpired));
}

#[tokio::test]
async fn code_is_consumed_by_successful_registration() {
    let f = fixture();
    register_local(&f, "a@x.com").await;

    let target = ContactPoint::Email("a@x.com".into());
    assert!(
        f.store
            .latest_active_code(&target, Utc::now())
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn concurrent_registrations_with_one_code_create_one_identity() {
    let f = fixture();
    seed_code(&f.store, "a@x.com", CODE).await;

    let (first, second) = tokio::join!(
        f.service.register(Some(account("a@x.com")), None),
        f.service.register(Some(account("a@x.com")), None),
    );
    let successes = [first.is_ok(), second.is_ok()]
        .iter()
        .filter(|ok| **ok)
        .count();
    assert_eq!(successes, 1);
    assert_eq!(f.store.count_by_email("a@x.com").await.unwrap(), 1);
}

#[tokio::test]
async fn phone_is_normalized_and_must_be_unique() {
    let f = fixture();
    seed_code(&f.store, "a@x.com", CODE).await;
    let mut input = account("a@x.com");
    input.phone = Some("+251 911-234 567".into());
    let identity = f.service.register(Some(input), None).await.unwrap();
    assert_eq!(identity.phone.as_deref(), Some("+251911234567"));

    seed_code(&f.store, "b@x.com", CODE).await;
    let mut input = account("b@x.com");
    input.phone = Some("+251911234567".into());
    let err = f.service.register(Some(input), None).await.unwrap_err();
    assert!(matches!(err, AuthError::PhoneAlreadyExists));

    let mut input = account("b@x.com");
    input.phone = Some("0911".into());
    let err = f.service.register(Some(input), None).await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidPhoneFormat));
}

#[tokio::test]
async fn input_names_win_over_provider_names() {
    let f = fixture();
    let input = NewAccount {
        first_name: Some("Selam".into()),
        last_name: Some("  ".into()),
        ..Default::default()
    };
    let identity = f
        .service
        .register(Some(input), Some(google_profile("g@x.com")))
        .await
        .unwrap();
    assert_eq!(identity.first_name.as_deref(), Some("Selam"));
    assert_eq!(identity.last_name.as_deref(), Some("Kebede"));
    assert_eq!(identity.provider, "google");
    assert!(identity.password_hash.is_none());
}

#[tokio::test]
async fn empty_provider_picture_is_dropped() {
    let f = fixture();
    let mut profile = google_profile("g@x.com");
    profile.picture = Some(String::new());
    let identity = f.service.register(None, Some(profile)).await.unwrap();
    assert!(identity.profile_picture.is_none());
}

// =============================================================================
// Login
// =============================================================================

#[tokio::test]
async fn login_issues_tokens_and_allows_multiple_sessions() {
    let f = fixture();
    let identity = register_local(&f, "a@x.com").await;

    let first = f
        .service
        .login(credentials("a@x.com", PASSWORD))
        .await
        .unwrap();
    assert_eq!(first.expires_in, Duration::from_secs(15 * 60));
    assert_eq!(first.user.id, identity.id);

    let record = f
        .store
        .find_refresh_token(&first.refresh_token)
        .await
        .unwrap()
        .unwrap();
    let days_left = (record.expires_at - Utc::now()).num_days();
    assert!((59..=60).contains(&days_left));

    let second = f
        .service
        .login(credentials("A@X.com ", PASSWORD))
        .await
        .unwrap();
    assert_ne!(first.refresh_token, second.refresh_token);
    assert_eq!(f.store.refresh_token_count(&identity.id).await, 2);

    // Both sessions remain usable.
    f.service.refresh_token(&first.refresh_token).await.unwrap();
    f.service.refresh_token(&second.refresh_token).await.unwrap();
}

#[tokio::test]
async fn access_token_carries_subject_and_locale() {
    let f = fixture();
    seed_code(&f.store, "a@x.com", CODE).await;
    let mut input = account("a@x.com");
    input.preferred_language = Some(Locale::Am);
    let identity = f.service.register(Some(input), None).await.unwrap();

    let result = f
        .service
        .login(credentials("a@x.com", PASSWORD))
        .await
        .unwrap();
    let claims = f.service.validate_access_token(&result.access_token).unwrap();
    assert_eq!(claims.sub, identity.id);
    assert_eq!(claims.lang, "am");
}

#[tokio::test]
async fn login_by_phone_number() {
    let f = fixture();
    seed_code(&f.store, "a@x.com", CODE).await;
    let mut input = account("a@x.com");
    input.phone = Some("+251911234567".into());
    f.service.register(Some(input), None).await.unwrap();

    let result = f
        .service
        .login(credentials("+251 911 234 567", PASSWORD))
        .await
        .unwrap();
    assert_eq!(result.user.email.as_deref(), Some("a@x.com"));
}

#[tokio::test]
async fn unknown_user_and_wrong_password_are_indistinguishable() {
    let f = fixture();
    register_local(&f, "a@x.com").await;

    let missing = f
        .service
        .login(credentials("nobody@x.com", PASSWORD))
        .await
        .unwrap_err();
    let wrong = f
        .service
        .login(credentials("a@x.com", "wrong1234"))
        .await
        .unwrap_err();
    assert!(matches!(missing, AuthError::InvalidCredentials));
    assert!(matches!(wrong, AuthError::InvalidCredentials));
    assert_eq!(missing.to_string(), wrong.to_string());
}

#[tokio::test]
async fn unverified_identity_cannot_log_in() {
    let f = fixture();
    f.store
        .create_identity(NewIdentity {
            email: Some("u@x.com".into()),
            phone: None,
            password_hash: Some(hash_password(PASSWORD, 4).unwrap()),
            is_verified: false,
            provider: String::new(),
            first_name: None,
            last_name: None,
            profile_picture: None,
            preferred_language: None,
        })
        .await
        .unwrap();

    let err = f
        .service
        .login(credentials("u@x.com", PASSWORD))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::EmailNotVerified));
}

#[tokio::test]
async fn login_error_does_not_leak_password() {
    let f = fixture();
    register_local(&f, "a@x.com").await;
    let err = f
        .service
        .login(credentials("a@x.com", "secret-guess-1"))
        .await
        .unwrap_err();
    assert!(!err.to_string().contains("secret-guess-1"));
    assert!(!format!("{err:?}").contains("secret-guess-1"));
}

// =============================================================================
// OAuthLogin
// =============================================================================

#[tokio::test]
async fn oauth_login_provisions_new_identity() {
    let f = fixture();
    let result = f
        .service
        .oauth_login(google_profile("g@x.com"))
        .await
        .unwrap();

    assert_eq!(result.user.provider, "google");
    assert!(result.user.is_verified);
    assert_eq!(result.expires_in, Duration::from_secs(15 * 60));
    assert!(!result.refresh_token.is_empty());

    let stored = f.store.find_by_email("g@x.com").await.unwrap().unwrap();
    assert!(stored.password_hash.is_none());
    assert_eq!(stored.first_name.as_deref(), Some("Abebe"));
    assert_eq!(
        stored.profile_picture.as_deref(),
        Some("https://example.com/p.png")
    );

    // Second login reuses the identity and opens another session.
    let again = f
        .service
        .oauth_login(google_profile("g@x.com"))
        .await
        .unwrap();
    assert_eq!(again.user.id, result.user.id);
    assert_eq!(f.store.refresh_token_count(&stored.id).await, 2);
}

#[tokio::test]
async fn federated_identity_cannot_use_password_login() {
    let f = fixture();
    f.service
        .oauth_login(google_profile("g@x.com"))
        .await
        .unwrap();
    let err = f
        .service
        .login(credentials("g@x.com", PASSWORD))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::OAuthUserCannotLoginWithPassword));
}

#[tokio::test]
async fn oauth_login_for_password_account_is_a_provider_mismatch() {
    let f = fixture();
    register_local(&f, "a@x.com").await;

    let err = f
        .service
        .oauth_login(google_profile("a@x.com"))
        .await
        .unwrap_err();
    match err {
        AuthError::OAuthProviderMismatch { expected, actual } => {
            assert_eq!(expected, "");
            assert_eq!(actual, "google");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn oauth_login_with_other_provider_is_a_mismatch() {
    let f = fixture();
    f.service
        .oauth_login(google_profile("g@x.com"))
        .await
        .unwrap();

    let mut profile = google_profile("g@x.com");
    profile.provider = "github".into();
    let err = f.service.oauth_login(profile).await.unwrap_err();
    assert!(matches!(err, AuthError::OAuthProviderMismatch { .. }));
}

#[tokio::test]
async fn oauth_profile_without_usable_email_is_rejected() {
    let f = fixture();

    let mut profile = google_profile("g@x.com");
    profile.email = None;
    let err = f.service.oauth_login(profile).await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidOAuthUserData));

    let mut profile = google_profile("g@x.com");
    profile.email_verified = false;
    let err = f.service.oauth_login(profile).await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidOAuthUserData));

    assert_eq!(f.store.count_by_email("g@x.com").await.unwrap(), 0);
}

// =============================================================================
// RefreshToken
// =============================================================================

#[tokio::test]
async fn refresh_rotates_and_old_token_fails_afterwards() {
    let f = fixture();
    register_local(&f, "a@x.com").await;
    let login = f
        .service
        .login(credentials("a@x.com", PASSWORD))
        .await
        .unwrap();

    let rotated = f.service.refresh_token(&login.refresh_token).await.unwrap();
    assert_ne!(rotated.refresh_token, login.refresh_token);
    assert_eq!(rotated.expires_in, Duration::from_secs(15 * 60));
    f.service
        .validate_access_token(&rotated.access_token)
        .unwrap();

    let replay = f
        .service
        .refresh_token(&login.refresh_token)
        .await
        .unwrap_err();
    assert!(matches!(replay, AuthError::TokenVerificationFailed));

    // The replacement works exactly once too.
    f.service
        .refresh_token(&rotated.refresh_token)
        .await
        .unwrap();
    let replay = f
        .service
        .refresh_token(&rotated.refresh_token)
        .await
        .unwrap_err();
    assert!(matches!(replay, AuthError::TokenVerificationFailed));
}

#[tokio::test]
async fn concurrent_refreshes_have_exactly_one_winner() {
    let f = fixture();
    register_local(&f, "a@x.com").await;
    let login = f
        .service
        .login(credentials("a@x.com", PASSWORD))
        .await
        .unwrap();

    let (a, b) = tokio::join!(
        f.service.refresh_token(&login.refresh_token),
        f.service.refresh_token(&login.refresh_token),
    );
    let outcomes = [a, b];
    let wins = outcomes.iter().filter(|r| r.is_ok()).count();
    assert_eq!(wins, 1);
    assert!(
        outcomes
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, AuthError::TokenVerificationFailed))
    );
}

#[tokio::test]
async fn expired_session_cannot_refresh() {
    let f = fixture();
    register_local(&f, "a@x.com").await;
    let login = f
        .service
        .login(credentials("a@x.com", PASSWORD))
        .await
        .unwrap();
    f.store
        .set_refresh_token_expiry(&login.refresh_token, Utc::now() - chrono::Duration::seconds(1))
        .await
        .unwrap();

    let err = f
        .service
        .refresh_token(&login.refresh_token)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::TokenVerificationFailed));
}

#[tokio::test]
async fn malformed_or_empty_refresh_token_is_rejected() {
    let f = fixture();
    assert!(matches!(
        f.service.refresh_token("").await,
        Err(AuthError::InvalidInput(_))
    ));
    assert!(matches!(
        f.service.refresh_token("not.a.jwt").await,
        Err(AuthError::TokenVerificationFailed)
    ));
}

#[tokio::test]
async fn signed_but_unknown_refresh_token_is_rejected() {
    let f = fixture();
    let token = f.service.tokens().issue_refresh_token("someone").unwrap();
    assert!(matches!(
        f.service.refresh_token(&token).await,
        Err(AuthError::TokenVerificationFailed)
    ));
}

#[tokio::test]
async fn orphaned_session_is_a_data_integrity_failure() {
    let f = fixture();
    let token = f.service.tokens().issue_refresh_token("ghost").unwrap();
    f.store
        .save_refresh_token("ghost", &token, Utc::now() + chrono::Duration::days(1))
        .await
        .unwrap();

    let err = f.service.refresh_token(&token).await.unwrap_err();
    assert!(matches!(err, AuthError::DatabaseOperationFailed(_)));
}

// =============================================================================
// Logout
// =============================================================================

#[tokio::test]
async fn logout_revokes_only_the_presented_session() {
    let f = fixture();
    let identity = register_local(&f, "a@x.com").await;
    let phone = f
        .service
        .login(credentials("a@x.com", PASSWORD))
        .await
        .unwrap();
    let laptop = f
        .service
        .login(credentials("a@x.com", PASSWORD))
        .await
        .unwrap();

    f.service
        .logout(&identity.id, &phone.refresh_token)
        .await
        .unwrap();

    let err = f
        .service
        .refresh_token(&phone.refresh_token)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::TokenVerificationFailed));
    f.service
        .refresh_token(&laptop.refresh_token)
        .await
        .unwrap();
}

#[tokio::test]
async fn double_logout_is_reported() {
    let f = fixture();
    let identity = register_local(&f, "a@x.com").await;
    let login = f
        .service
        .login(credentials("a@x.com", PASSWORD))
        .await
        .unwrap();

    f.service
        .logout(&identity.id, &login.refresh_token)
        .await
        .unwrap();
    let err = f
        .service
        .logout(&identity.id, &login.refresh_token)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::DatabaseOperationFailed(_)));
}

#[tokio::test]
async fn logout_requires_identity_and_ownership() {
    let f = fixture();
    let identity = register_local(&f, "a@x.com").await;
    let login = f
        .service
        .login(credentials("a@x.com", PASSWORD))
        .await
        .unwrap();

    assert!(matches!(
        f.service.logout("", &login.refresh_token).await,
        Err(AuthError::InvalidInput(_))
    ));
    assert!(matches!(
        f.service.logout("someone-else", &login.refresh_token).await,
        Err(AuthError::DatabaseOperationFailed(_))
    ));
    // Still active for its owner.
    f.service
        .logout(&identity.id, &login.refresh_token)
        .await
        .unwrap();
}

// =============================================================================
// Lookups and deadlines
// =============================================================================

#[tokio::test]
async fn find_identity_returns_sanitized_profile() {
    let f = fixture();
    let identity = register_local(&f, "a@x.com").await;
    let profile = f.service.find_identity(&identity.id).await.unwrap();
    assert_eq!(profile.email.as_deref(), Some("a@x.com"));

    assert!(matches!(
        f.service.find_identity("missing").await,
        Err(AuthError::UserNotFound)
    ));
}

#[tokio::test(start_paused = true)]
async fn operations_past_their_deadline_time_out() {
    let result: Result<(), AuthError> = with_deadline(Duration::from_secs(5), "slow", async {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(())
    })
    .await;
    assert!(matches!(result, Err(AuthError::Timeout("slow"))));

    let fast = with_deadline(Duration::from_secs(5), "fast", async { Ok(7) }).await;
    assert_eq!(fast.unwrap(), 7);
}

#[test]
fn service_rejects_shared_signing_secret() {
    let store = Arc::new(MemoryStore::new());
    let mut config = config();
    config.tokens = TokenConfig::new("same", "same");
    assert!(AuthService::new(&config, store.clone(), store).is_err());
}

/// Lets a competing first login create the same identity right before the
/// service's own insert.
struct RacingStore {
    inner: MemoryStore,
}

#[async_trait::async_trait]
impl IdentityStore for RacingStore {
    async fn create_identity(&self, identity: NewIdentity) -> StoreResult<Identity> {
        self.inner.create_identity(identity.clone()).await?;
        self.inner.create_identity(identity).await
    }
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Identity>> {
        self.inner.find_by_email(email).await
    }
    async fn find_by_phone(&self, phone: &str) -> StoreResult<Option<Identity>> {
        self.inner.find_by_phone(phone).await
    }
    async fn find_by_id(&self, id: &str) -> StoreResult<Option<Identity>> {
        self.inner.find_by_id(id).await
    }
    async fn count_by_email(&self, email: &str) -> StoreResult<i64> {
        self.inner.count_by_email(email).await
    }
    async fn count_by_phone(&self, phone: &str) -> StoreResult<i64> {
        self.inner.count_by_phone(phone).await
    }
    async fn update_identity(&self, identity: &Identity) -> StoreResult<()> {
        self.inner.update_identity(identity).await
    }
    async fn save_refresh_token(
        &self,
        user_id: &str,
        raw_token: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<RefreshTokenRecord> {
        self.inner.save_refresh_token(user_id, raw_token, expires_at).await
    }
    async fn find_refresh_token(&self, raw_token: &str) -> StoreResult<Option<RefreshTokenRecord>> {
        self.inner.find_refresh_token(raw_token).await
    }
    async fn find_and_revoke(&self, user_id: &str, raw_token: &str) -> StoreResult<()> {
        self.inner.find_and_revoke(user_id, raw_token).await
    }
    async fn rotate_refresh_token(
        &self,
        user_id: &str,
        old_raw_token: &str,
        new_raw_token: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<RefreshTokenRecord> {
        self.inner
            .rotate_refresh_token(user_id, old_raw_token, new_raw_token, expires_at)
            .await
    }
}

#[tokio::test]
async fn oauth_login_losing_the_creation_race_still_logs_in() {
    let identities = Arc::new(RacingStore {
        inner: MemoryStore::new(),
    });
    let otps = Arc::new(MemoryStore::new());
    let service = AuthService::new(&config(), identities.clone(), otps).unwrap();

    let result = service
        .oauth_login(google_profile("new@x.com"))
        .await
        .unwrap();
    assert_eq!(result.user.email.as_deref(), Some("new@x.com"));
    assert_eq!(result.user.provider, "google");
    assert_eq!(identities.inner.count_by_email("new@x.com").await.unwrap(), 1);
}

#[tokio::test]
async fn concurrent_first_oauth_logins_both_succeed() {
    let f = fixture();
    let (a, b) = tokio::join!(
        f.service.oauth_login(google_profile("new@x.com")),
        f.service.oauth_login(google_profile("new@x.com")),
    );
    let (a, b) = (a.unwrap(), b.unwrap());
    assert_eq!(a.user.id, b.user.id);
    assert_eq!(f.store.count_by_email("new@x.com").await.unwrap(), 1);
}
