//! Authentication request handlers.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use axum_extra::extract::cookie::CookieJar;
use jobmate_core::models::{Credentials, LoginResult, UserProfile};

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{
    LoginRequest, MessageResponse, RefreshRequest, RefreshResponse, RegisterRequest,
    RegisterResponse, TokenResponse,
};
use crate::services::cookies::{
    REFRESH_COOKIE, access_cookie, clear_access_cookie, clear_refresh_cookie, refresh_cookie,
};

/// `POST /auth/register`: create a verified account with a code from
/// `/auth/request-otp`.
pub async fn register_handler(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<RegisterResponse>)> {
    let identity = state.auth.register(Some(body.into()), None).await?;
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "Registration successful".into(),
            user: identity.profile(),
        }),
    ))
}

/// `POST /auth/login`: authenticate with email (or phone) and password.
pub async fn login_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<LoginRequest>,
) -> AppResult<(CookieJar, Json<TokenResponse>)> {
    let result = state
        .auth
        .login(Credentials {
            identifier: body.identifier,
            password: body.password,
        })
        .await?;
    Ok(session_response(&state, jar, result))
}

/// `POST /auth/refresh`: rotate the refresh token and issue a new access token.
pub async fn refresh_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Bytes,
) -> AppResult<(CookieJar, Json<RefreshResponse>)> {
    let presented = presented_refresh_token(&jar, &body)
        .ok_or_else(|| AppError::Unauthorized("Missing refresh token".into()))?;
    let outcome = state.auth.refresh_token(&presented).await?;

    let secure = state.config.cookie_secure;
    let jar = jar
        .add(access_cookie(&outcome.access_token, outcome.expires_in, secure))
        .add(refresh_cookie(
            &outcome.refresh_token,
            outcome.refresh_expires_in,
            secure,
        ));
    Ok((
        jar,
        Json(RefreshResponse {
            access_token: outcome.access_token,
            refresh_token: outcome.refresh_token,
            expires_in: outcome.expires_in.as_secs(),
        }),
    ))
}

/// `POST /auth/logout`: revoke the presented session. Requires authentication.
///
/// Auth cookies are cleared even when revocation fails.
pub async fn logout_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    jar: CookieJar,
    body: Bytes,
) -> Response {
    let presented = presented_refresh_token(&jar, &body);
    let secure = state.config.cookie_secure;
    let jar = jar
        .add(clear_access_cookie(secure))
        .add(clear_refresh_cookie(secure));

    let Some(presented) = presented else {
        return (jar, AppError::Validation("Missing refresh token".into())).into_response();
    };
    match state.auth.logout(user.id(), &presented).await {
        Ok(()) => (jar, Json(MessageResponse::new("Logged out"))).into_response(),
        Err(e) => (jar, AppError::from(e)).into_response(),
    }
}

/// `GET /auth/me`: the authenticated identity.
pub async fn me_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> AppResult<Json<UserProfile>> {
    Ok(Json(state.auth.find_identity(user.id()).await?))
}

/// Set both session cookies and build the token body.
pub(crate) fn session_response(
    state: &AppState,
    jar: CookieJar,
    result: LoginResult,
) -> (CookieJar, Json<TokenResponse>) {
    let secure = state.config.cookie_secure;
    let jar = jar
        .add(access_cookie(&result.access_token, result.expires_in, secure))
        .add(refresh_cookie(
            &result.refresh_token,
            result.refresh_expires_in,
            secure,
        ));
    (
        jar,
        Json(TokenResponse {
            access_token: result.access_token,
            refresh_token: result.refresh_token,
            expires_in: result.expires_in.as_secs(),
            user: result.user,
        }),
    )
}

/// The refresh cookie, else `refreshToken` from a JSON body.
fn presented_refresh_token(jar: &CookieJar, body: &Bytes) -> Option<String> {
    let from_cookie = jar
        .get(REFRESH_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty());
    from_cookie.or_else(|| {
        serde_json::from_slice::<RefreshRequest>(body)
            .ok()
            .and_then(|r| r.refresh_token)
            .filter(|v| !v.is_empty())
    })
}
