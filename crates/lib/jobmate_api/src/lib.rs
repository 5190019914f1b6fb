//! # jobmate_api
//!
//! HTTP API for JobMate authentication.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use jobmate_core::auth::{AuthError, AuthService, OtpService};
use jobmate_core::notify::Notifier;
use jobmate_core::oauth::{GoogleProvider, OAuthFederation, OAuthStateStore};
use jobmate_core::store::{IdentityStore, OtpStore};
use sqlx::PgPool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ApiConfig;
use crate::handlers::{auth, oauth, otp};

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub otp: Arc<OtpService>,
    pub oauth: Arc<OAuthFederation>,
    pub oauth_states: Arc<OAuthStateStore>,
    /// API configuration.
    pub config: ApiConfig,
}

impl AppState {
    /// Wire the auth services over the given stores and notifier.
    pub fn new(
        config: ApiConfig,
        identities: Arc<dyn IdentityStore>,
        otps: Arc<dyn OtpStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, AuthError> {
        let auth_config = config.auth_config();
        let auth = AuthService::new(&auth_config, identities, otps.clone())?;
        let otp = OtpService::new(&auth_config, otps, notifier);

        let mut federation = OAuthFederation::new();
        if let Some(google) = &config.google {
            federation = federation.with_provider(Arc::new(GoogleProvider::new(google.clone())));
        }

        Ok(Self {
            auth: Arc::new(auth),
            otp: Arc::new(otp),
            oauth: Arc::new(federation),
            oauth_states: Arc::new(OAuthStateStore::new()),
            config,
        })
    }
}

/// Run embedded database migrations.
///
/// Delegates to `jobmate_core::migrate::migrate()` which owns the migration files.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    jobmate_core::migrate::migrate(pool).await
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Public routes (no auth required)
    let public = Router::new()
        .route(routes::POST_AUTH_REQUEST_OTP, post(otp::request_otp_handler))
        .route(routes::POST_AUTH_REGISTER, post(auth::register_handler))
        .route(routes::POST_AUTH_LOGIN, post(auth::login_handler))
        .route(routes::POST_AUTH_REFRESH, post(auth::refresh_handler))
        .route(routes::GET_AUTH_OAUTH_LOGIN, get(oauth::oauth_login_handler))
        .route(
            routes::GET_AUTH_OAUTH_CALLBACK,
            get(oauth::oauth_callback_handler),
        );

    // Protected routes (require auth)
    let protected = Router::new()
        .route(routes::POST_AUTH_LOGOUT, post(auth::logout_handler))
        .route(routes::GET_AUTH_ME, get(auth::me_handler))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_auth,
        ));

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
