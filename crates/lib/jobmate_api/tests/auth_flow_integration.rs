//! Integration test: drive the full auth surface through the router against
//! the in-memory store.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode, header};
use jobmate_api::{AppState, config::ApiConfig};
use jobmate_core::auth::{AuthError, AuthService, OtpService};
use jobmate_core::models::{ContactPoint, OAuthProfile};
use jobmate_core::notify::{Notifier, NotifyError};
use jobmate_core::oauth::{
    GoogleConfig, GoogleProvider, OAuthFederation, OAuthProvider, OAuthStateStore,
};
use jobmate_core::store::MemoryStore;
use serde_json::{Value, json};
use tower::ServiceExt;

/// Keeps every message so the test can read the code back.
#[derive(Default)]
struct CapturingNotifier {
    sent: Mutex<Vec<(ContactPoint, String)>>,
}

impl CapturingNotifier {
    fn last_code(&self) -> String {
        let sent = self.sent.lock().expect("lock");
        let (_, body) = sent.last().expect("a message was sent");
        body.split_whitespace()
            .map(|w| w.trim_end_matches('.'))
            .find(|w| w.len() > 1 && w.chars().all(|c| c.is_ascii_digit()))
            .expect("code in message")
            .to_string()
    }
}

#[async_trait]
impl Notifier for CapturingNotifier {
    async fn send(
        &self,
        destination: &ContactPoint,
        _subject: &str,
        body: &str,
    ) -> Result<(), NotifyError> {
        self.sent
            .lock()
            .expect("lock")
            .push((destination.clone(), body.to_string()));
        Ok(())
    }
}

/// Accepts the code `"good-code"` and returns a fixed verified profile.
struct FakeProvider;

#[async_trait]
impl OAuthProvider for FakeProvider {
    fn name(&self) -> &str {
        "fake"
    }

    fn authorization_url(&self, state: &str) -> Result<String, AuthError> {
        Ok(format!("https://idp.example/authorize?state={state}"))
    }

    async fn exchange_code(&self, code: &str) -> Result<OAuthProfile, AuthError> {
        if code != "good-code" {
            return Err(AuthError::OAuthExchangeFailed("bad code".into()));
        }
        Ok(OAuthProfile {
            provider: String::new(),
            subject: "fake-123".into(),
            email: Some("federated@example.com".into()),
            email_verified: true,
            first_name: Some("Fed".into()),
            last_name: Some("Erated".into()),
            picture: None,
        })
    }
}

fn test_config() -> ApiConfig {
    ApiConfig {
        bind_addr: "127.0.0.1:0".into(),
        pg_connection_url: "postgres://unused".into(),
        access_token_secret: "integration-access-secret".into(),
        refresh_token_secret: "integration-refresh-secret".into(),
        access_token_ttl: Duration::from_secs(900),
        refresh_token_ttl: Duration::from_secs(24 * 60 * 60),
        cookie_secure: false,
        google: Some(GoogleConfig::new(
            "client-id".to_string(),
            "client-secret".to_string(),
            "http://localhost:8080/auth/oauth/google/callback".to_string(),
        )),
        smtp: None,
    }
}

fn test_app() -> (Router, Arc<CapturingNotifier>) {
    let config = test_config();
    let mut auth_config = config.auth_config();
    auth_config.bcrypt_cost = 4;

    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(CapturingNotifier::default());
    let auth = AuthService::new(&auth_config, store.clone(), store.clone()).expect("auth service");
    let otp = OtpService::new(&auth_config, store, notifier.clone());

    let google = config.google.clone().expect("google config");
    let federation = OAuthFederation::new()
        .with_provider(Arc::new(GoogleProvider::new(google)))
        .with_provider(Arc::new(FakeProvider));

    let state = AppState {
        auth: Arc::new(auth),
        otp: Arc::new(otp),
        oauth: Arc::new(federation),
        oauth_states: Arc::new(OAuthStateStore::new()),
        config,
    };
    (jobmate_api::router(state), notifier)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn call(app: &Router, req: Request<Body>) -> Response<Body> {
    app.clone().oneshot(req).await.expect("request")
}

async fn json_body(resp: Response<Body>) -> Value {
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("parse JSON")
}

/// Value of the named cookie among the response's `Set-Cookie` headers.
fn set_cookie(resp: &Response<Body>, name: &str) -> Option<String> {
    let prefix = format!("{name}=");
    resp.headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|v| v.strip_prefix(&prefix))
        .map(|rest| rest.split(';').next().unwrap_or_default().to_string())
}

#[tokio::test]
async fn password_account_full_lifecycle() {
    let (app, notifier) = test_app();

    // Request a registration code.
    let resp = call(
        &app,
        post_json("/auth/request-otp", json!({ "email": "Alice@Example.com" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let code = notifier.last_code();
    assert_eq!(code.len(), 6);

    // Register with it.
    let resp = call(
        &app,
        post_json(
            "/auth/register",
            json!({
                "email": "alice@example.com",
                "password": "abc12345",
                "otp": code,
                "firstName": "Alice",
            }),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let registered = json_body(resp).await;
    assert_eq!(registered["user"]["email"], "alice@example.com");

    // The code is single-use.
    let resp = call(
        &app,
        post_json(
            "/auth/register",
            json!({ "email": "alice@example.com", "password": "abc12345", "otp": code }),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    // Wrong password.
    let resp = call(
        &app,
        post_json(
            "/auth/login",
            json!({ "email": "alice@example.com", "password": "wrong-pass1" }),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    // Login sets both cookies and returns the tokens.
    let resp = call(
        &app,
        post_json(
            "/auth/login",
            json!({ "email": "alice@example.com", "password": "abc12345" }),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let refresh_cookie = set_cookie(&resp, "refresh_token").expect("refresh cookie");
    assert!(set_cookie(&resp, "access_token").is_some());
    let login = json_body(resp).await;
    let access = login["accessToken"].as_str().expect("access token").to_string();
    assert_eq!(login["refreshToken"], refresh_cookie.as_str());
    assert_eq!(login["expiresIn"], 900);

    // Bearer access works.
    let resp = call(
        &app,
        Request::builder()
            .uri("/auth/me")
            .header(header::AUTHORIZATION, format!("Bearer {access}"))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["firstName"], "Alice");

    // Refresh via cookie rotates the session.
    let refresh_with_cookie = |token: &str| {
        Request::builder()
            .method("POST")
            .uri("/auth/refresh")
            .header(header::COOKIE, format!("refresh_token={token}"))
            .body(Body::empty())
            .unwrap()
    };
    let resp = call(&app, refresh_with_cookie(&refresh_cookie)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(set_cookie(&resp, "refresh_token").is_some());
    let rotated = json_body(resp).await;
    let new_refresh = rotated["refreshToken"].as_str().expect("refresh").to_string();
    let new_access = rotated["accessToken"].as_str().expect("access").to_string();
    assert_ne!(new_refresh, refresh_cookie);

    // The old refresh token is dead.
    let resp = call(&app, refresh_with_cookie(&refresh_cookie)).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    // Logout with the body token, authenticated by the access cookie.
    let resp = call(
        &app,
        Request::builder()
            .method("POST")
            .uri("/auth/logout")
            .header(header::COOKIE, format!("access_token={new_access}"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json!({ "refreshToken": new_refresh }).to_string()))
            .unwrap(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(set_cookie(&resp, "refresh_token").as_deref(), Some(""));

    // The revoked session can no longer refresh.
    let resp = call(&app, refresh_with_cookie(&new_refresh)).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn protected_routes_require_a_token() {
    let (app, _) = test_app();

    let resp = call(&app, get("/auth/me")).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(resp).await;
    assert!(body["error"].is_string());
    assert!(body["message"].is_string());

    let resp = call(
        &app,
        Request::builder()
            .uri("/auth/me")
            .header(header::AUTHORIZATION, "Bearer not-a-jwt")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = call(&app, post_json("/auth/logout", json!({}))).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn malformed_requests_are_rejected() {
    let (app, notifier) = test_app();

    let resp = call(
        &app,
        post_json("/auth/request-otp", json!({ "email": "not-an-email" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(notifier.sent.lock().expect("lock").is_empty());

    let resp = call(
        &app,
        post_json(
            "/auth/register",
            json!({ "email": "bob@example.com", "password": "short", "otp": "123456" }),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = call(
        &app,
        post_json(
            "/auth/login",
            json!({ "email": "nobody@example.com", "password": "abc12345" }),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn oauth_login_redirects_with_state() {
    let (app, _) = test_app();

    let resp = call(&app, get("/auth/oauth/unknown/login")).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = call(&app, get("/auth/oauth/google/login")).await;
    assert!(resp.status().is_redirection());
    let location = resp
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .expect("location header");
    assert!(location.starts_with("https://accounts.google.com/"));
    assert!(location.contains("state="));
    assert!(location.contains("client_id=client-id"));
}

#[tokio::test]
async fn oauth_callback_validates_state_and_logs_in() {
    let (app, _) = test_app();

    // Unknown state.
    let resp = call(
        &app,
        get("/auth/oauth/fake/callback?code=good-code&state=forged"),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    // Missing code.
    let resp = call(&app, get("/auth/oauth/fake/callback?state=whatever")).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // Provider-reported error.
    let resp = call(&app, get("/auth/oauth/fake/callback?error=access_denied")).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    // Real round trip: the state comes from the login redirect.
    let resp = call(&app, get("/auth/oauth/fake/login")).await;
    let location = resp
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .expect("location header")
        .to_string();
    let state = location
        .split("state=")
        .nth(1)
        .expect("state in redirect")
        .to_string();

    let callback = format!("/auth/oauth/fake/callback?code=good-code&state={state}");
    let resp = call(&app, get(&callback)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(set_cookie(&resp, "refresh_token").is_some());
    let body = json_body(resp).await;
    assert_eq!(body["user"]["email"], "federated@example.com");
    assert!(body["accessToken"].is_string());

    // The state was consumed.
    let resp = call(&app, get(&callback)).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    // The federated account cannot use password login.
    let resp = call(
        &app,
        post_json(
            "/auth/login",
            json!({ "email": "federated@example.com", "password": "abc12345" }),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}
