//! Auth cookies: http-only, same-site Lax, path `/`.

use axum_extra::extract::cookie::{Cookie, SameSite};
use time::Duration;

/// Cookie name for the access token.
pub const ACCESS_COOKIE: &str = "access_token";
/// Cookie name for the refresh token.
pub const REFRESH_COOKIE: &str = "refresh_token";

fn auth_cookie(name: &str, value: &str, max_age: Duration, secure: bool) -> Cookie<'static> {
    Cookie::build((name.to_string(), value.to_string()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/".to_string())
        .max_age(max_age)
        .build()
}

fn seconds(ttl: std::time::Duration) -> Duration {
    Duration::seconds(i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX))
}

/// Access-token cookie living as long as the token.
pub fn access_cookie(token: &str, ttl: std::time::Duration, secure: bool) -> Cookie<'static> {
    auth_cookie(ACCESS_COOKIE, token, seconds(ttl), secure)
}

/// Refresh-token cookie living as long as the stored session.
pub fn refresh_cookie(token: &str, ttl: std::time::Duration, secure: bool) -> Cookie<'static> {
    auth_cookie(REFRESH_COOKIE, token, seconds(ttl), secure)
}

/// Expired access cookie.
pub fn clear_access_cookie(secure: bool) -> Cookie<'static> {
    auth_cookie(ACCESS_COOKIE, "", Duration::ZERO, secure)
}

/// Expired refresh cookie.
pub fn clear_refresh_cookie(secure: bool) -> Cookie<'static> {
    auth_cookie(REFRESH_COOKIE, "", Duration::ZERO, secure)
}
