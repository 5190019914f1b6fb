//! Request and response bodies.

use jobmate_core::models::{Locale, NewAccount, UserProfile};
use serde::{Deserialize, Serialize};

/// Error body for every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OtpRequestBody {
    pub email: String,
    pub phone: Option<String>,
}

#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub otp: String,
    pub phone: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub preferred_language: Option<Locale>,
}

impl From<RegisterRequest> for NewAccount {
    fn from(body: RegisterRequest) -> Self {
        NewAccount {
            email: body.email,
            password: body.password,
            otp: body.otp,
            phone: body.phone,
            first_name: body.first_name,
            last_name: body.last_name,
            preferred_language: body.preferred_language,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub message: String,
    pub user: UserProfile,
}

#[derive(Clone, Deserialize)]
pub struct LoginRequest {
    /// Email address or phone number.
    #[serde(alias = "email", alias = "phone")]
    pub identifier: String,
    pub password: String,
}

/// Body of a successful Login or OAuth callback. Tokens are also set as cookies.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Access-token lifetime in seconds.
    pub expires_in: u64,
    pub user: UserProfile,
}

/// Optional body for refresh and logout; the `refresh_token` cookie wins.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    #[serde(alias = "refresh_token")]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OAuthCallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    /// Set by the provider when the user declined or the request was invalid.
    pub error: Option<String>,
}
