//! Authentication middleware: access-token extraction and verification.

use axum::http::header::AUTHORIZATION;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use jobmate_core::models::TokenClaims;

use crate::AppState;
use crate::error::AppError;
use crate::services::cookies::ACCESS_COOKIE;

/// Validated access-token claims, stored in request extensions.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub TokenClaims);

impl AuthenticatedUser {
    pub fn id(&self) -> &str {
        &self.0.sub
    }
}

/// Axum middleware: takes the token from `Authorization: Bearer <token>` or
/// the access cookie, verifies it and injects [`AuthenticatedUser`].
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = match request.headers().get(AUTHORIZATION) {
        Some(value) => value
            .to_str()
            .ok()
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::to_string)
            .ok_or_else(|| AppError::Unauthorized("Invalid authorization scheme".into()))?,
        None => CookieJar::from_headers(request.headers())
            .get(ACCESS_COOKIE)
            .map(|c| c.value().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| AppError::Unauthorized("Missing access token".into()))?,
    };

    let claims = state
        .auth
        .validate_access_token(&token)
        .map_err(|_| AppError::Unauthorized("Invalid or expired token".into()))?;

    request.extensions_mut().insert(AuthenticatedUser(claims));

    Ok(next.run(request).await)
}
