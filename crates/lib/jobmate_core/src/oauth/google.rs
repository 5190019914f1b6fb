//! Google as an OAuth2 identity provider.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use super::OAuthProvider;
use crate::auth::AuthError;
use crate::models::OAuthProfile;

pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/auth";
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

/// Per-request limit for calls to Google.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Client registration and endpoints for Google.
#[derive(Clone)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_url: String,
    pub scopes: Vec<String>,
    pub auth_url: String,
    pub token_url: String,
    pub userinfo_url: String,
}

impl GoogleConfig {
    /// Config against Google's public endpoints with the email and profile scopes.
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_url: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_url: redirect_url.into(),
            scopes: vec![
                "https://www.googleapis.com/auth/userinfo.email".to_string(),
                "https://www.googleapis.com/auth/userinfo.profile".to_string(),
            ],
            auth_url: GOOGLE_AUTH_URL.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
            userinfo_url: GOOGLE_USERINFO_URL.to_string(),
        }
    }
}

impl std::fmt::Debug for GoogleConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleConfig")
            .field("client_id", &self.client_id)
            .field("redirect_url", &self.redirect_url)
            .field("scopes", &self.scopes)
            .finish_non_exhaustive()
    }
}

/// Response from Google's token endpoint.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Response from the v2 userinfo endpoint.
#[derive(Debug, Deserialize)]
struct GoogleUserInfo {
    id: String,
    email: Option<String>,
    #[serde(default)]
    verified_email: bool,
    given_name: Option<String>,
    family_name: Option<String>,
    picture: Option<String>,
}

impl From<GoogleUserInfo> for OAuthProfile {
    fn from(info: GoogleUserInfo) -> Self {
        OAuthProfile {
            provider: GoogleProvider::NAME.to_string(),
            subject: info.id,
            email: info.email,
            email_verified: info.verified_email,
            first_name: info.given_name,
            last_name: info.family_name,
            picture: info.picture,
        }
    }
}

pub struct GoogleProvider {
    config: GoogleConfig,
    client: reqwest::Client,
}

impl GoogleProvider {
    pub const NAME: &'static str = "google";

    pub fn new(config: GoogleConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    async fn fetch_access_token(&self, code: &str) -> Result<String, AuthError> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("redirect_uri", self.config.redirect_url.as_str()),
        ];

        let resp = self
            .client
            .post(&self.config.token_url)
            .timeout(REQUEST_TIMEOUT)
            .form(&params)
            .send()
            .await
            .map_err(|e| AuthError::OAuthExchangeFailed(format!("token exchange failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(AuthError::OAuthExchangeFailed(format!(
                "token exchange HTTP {status}: {body}"
            )));
        }

        let token = resp
            .json::<TokenResponse>()
            .await
            .map_err(|e| AuthError::OAuthExchangeFailed(format!("token response parse error: {e}")))?;
        Ok(token.access_token)
    }

    async fn fetch_user_info(&self, access_token: &str) -> Result<GoogleUserInfo, AuthError> {
        let resp = self
            .client
            .get(&self.config.userinfo_url)
            .timeout(REQUEST_TIMEOUT)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AuthError::OAuthExchangeFailed(format!("userinfo request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            return Err(AuthError::OAuthExchangeFailed(format!(
                "userinfo HTTP {status}"
            )));
        }

        resp.json::<GoogleUserInfo>()
            .await
            .map_err(|e| AuthError::OAuthExchangeFailed(format!("userinfo parse error: {e}")))
    }
}

#[async_trait]
impl OAuthProvider for GoogleProvider {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn authorization_url(&self, state: &str) -> Result<String, AuthError> {
        let scope = self.config.scopes.join(" ");
        let url = Url::parse_with_params(
            &self.config.auth_url,
            &[
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", self.config.redirect_url.as_str()),
                ("response_type", "code"),
                ("scope", scope.as_str()),
                ("state", state),
                ("access_type", "offline"),
            ],
        )
        .map_err(|e| AuthError::OAuthExchangeFailed(format!("invalid authorization URL: {e}")))?;
        Ok(url.into())
    }

    async fn exchange_code(&self, code: &str) -> Result<OAuthProfile, AuthError> {
        let access_token = self.fetch_access_token(code).await?;
        let info = self.fetch_user_info(&access_token).await?;
        debug!(subject = %info.id, "Google profile fetched");
        Ok(info.into())
    }
}
