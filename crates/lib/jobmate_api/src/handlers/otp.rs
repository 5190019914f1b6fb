//! Verification code requests.

use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use jobmate_core::auth::AuthError;
use jobmate_core::models::OtpRequest;
use tracing::warn;

use crate::AppState;
use crate::error::AppResult;
use crate::models::{MessageResponse, OtpRequestBody};

const GENERIC_REPLY: &str = "If the address is valid, a verification code has been sent";

/// `POST /auth/request-otp`: send a registration code to an email address.
///
/// Replies identically whether or not a code went out; only malformed input
/// and the rate limit are reported.
pub async fn request_otp_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<OtpRequestBody>,
) -> AppResult<Json<MessageResponse>> {
    let request = OtpRequest {
        email: body.email,
        phone: body.phone,
        requestor_ip: client_ip(&headers),
    };
    match state.otp.request_otp(request).await {
        Ok(()) => {}
        Err(
            e @ (AuthError::InvalidEmailFormat
            | AuthError::InvalidPhoneFormat
            | AuthError::RateLimited),
        ) => return Err(e.into()),
        Err(e) => warn!(error = %e, "verification code request failed"),
    }
    Ok(Json(MessageResponse::new(GENERIC_REPLY)))
}

/// First hop of `X-Forwarded-For`, if any.
fn client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
