//! OAuth2 federation: provider registry, authorization-code exchange and
//! CSRF state tracking.

pub mod google;
pub mod state;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::auth::AuthError;
use crate::models::OAuthProfile;

pub use google::{GoogleConfig, GoogleProvider};
pub use state::{OAuthStateStore, PendingLogin, generate_state};

/// An external identity provider.
#[async_trait]
pub trait OAuthProvider: Send + Sync {
    /// Registry key and the value recorded as an identity's provider.
    fn name(&self) -> &str;

    /// Where to send the browser to start a login carrying `state`.
    fn authorization_url(&self, state: &str) -> Result<String, AuthError>;

    /// Exchange an authorization code for the caller's normalized profile.
    async fn exchange_code(&self, code: &str) -> Result<OAuthProfile, AuthError>;
}

/// Registry of configured providers, keyed by name.
#[derive(Clone, Default)]
pub struct OAuthFederation {
    providers: BTreeMap<String, Arc<dyn OAuthProvider>>,
}

impl OAuthFederation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider, replacing any previous one with the same name.
    pub fn with_provider(mut self, provider: Arc<dyn OAuthProvider>) -> Self {
        self.providers.insert(provider.name().to_string(), provider);
        self
    }

    pub fn supported_providers(&self) -> Vec<String> {
        self.providers.keys().cloned().collect()
    }

    pub fn is_supported(&self, provider: &str) -> bool {
        self.providers.contains_key(provider)
    }

    fn provider(&self, name: &str) -> Result<&Arc<dyn OAuthProvider>, AuthError> {
        self.providers
            .get(name)
            .ok_or_else(|| AuthError::UnsupportedProvider(name.to_string()))
    }

    pub fn authorization_url(&self, provider: &str, state: &str) -> Result<String, AuthError> {
        self.provider(provider)?.authorization_url(state)
    }

    /// Exchange `code` with `provider`. The returned profile always names
    /// the provider it came from.
    pub async fn exchange_code_for_profile(
        &self,
        provider: &str,
        code: &str,
    ) -> Result<OAuthProfile, AuthError> {
        if code.trim().is_empty() {
            return Err(AuthError::InvalidInput("missing authorization code".into()));
        }
        let provider = self.provider(provider)?;
        let mut profile = provider.exchange_code(code).await?;
        profile.provider = provider.name().to_string();
        Ok(profile)
    }
}
