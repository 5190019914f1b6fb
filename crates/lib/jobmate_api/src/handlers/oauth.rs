//! OAuth2 sign-in: redirect to the provider and handle its callback.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::response::Redirect;
use axum_extra::extract::cookie::CookieJar;
use jobmate_core::auth::AuthError;
use tracing::{info, warn};

use super::auth::session_response;
use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::models::{OAuthCallbackParams, TokenResponse};

/// `GET /auth/oauth/{provider}/login`: redirect to the provider with a
/// fresh single-use state value.
pub async fn oauth_login_handler(
    State(state): State<AppState>,
    Path(provider): Path<String>,
) -> AppResult<Redirect> {
    if !state.oauth.is_supported(&provider) {
        return Err(AuthError::UnsupportedProvider(provider).into());
    }
    let csrf_state = state.oauth_states.issue(&provider);
    let url = state.oauth.authorization_url(&provider, &csrf_state)?;
    Ok(Redirect::to(&url))
}

/// `GET /auth/oauth/{provider}/callback`: validate state, exchange the
/// code and log in (provisioning the identity on first use).
pub async fn oauth_callback_handler(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    jar: CookieJar,
    Query(params): Query<OAuthCallbackParams>,
) -> AppResult<(CookieJar, Json<TokenResponse>)> {
    if let Some(error) = params.error {
        warn!(provider = %provider, error = %error, "provider returned an error");
        return Err(AppError::Unauthorized("Sign-in was not completed".into()));
    }
    let csrf_state = params
        .state
        .ok_or_else(|| AppError::Validation("Missing state".into()))?;
    let code = params
        .code
        .ok_or_else(|| AppError::Validation("Missing code".into()))?;

    if !state.oauth_states.consume(&csrf_state, &provider) {
        return Err(AppError::Unauthorized("Invalid or expired OAuth state".into()));
    }

    let profile = state
        .oauth
        .exchange_code_for_profile(&provider, &code)
        .await?;
    let result = state.auth.oauth_login(profile).await?;
    info!(provider = %provider, user_id = %result.user.id, "OAuth callback completed");

    Ok(session_response(&state, jar, result))
}
