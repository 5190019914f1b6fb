//! Identity domain models.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Enums
// =============================================================================

/// Preferred interface language. Travels in the access token as the locale claim.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "preferred_language", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    Am,
    #[default]
    En,
}

impl Locale {
    pub fn as_str(&self) -> &'static str {
        match self {
            Locale::Am => "am",
            Locale::En => "en",
        }
    }

    /// Parse a locale tag, returning `None` for unsupported values.
    pub fn parse(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "am" => Some(Locale::Am),
            "en" => Some(Locale::En),
            _ => None,
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Identity
// =============================================================================

/// Durable user record.
///
/// Deliberately not `Serialize`: the password hash must never cross the
/// boundary. Convert to [`UserProfile`] before handing data to a transport.
#[derive(Clone)]
pub struct Identity {
    pub id: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub password_hash: Option<String>,
    pub is_verified: bool,
    /// Federation provider name; empty for local (password) identities.
    pub provider: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub profile_picture: Option<String>,
    pub preferred_language: Option<Locale>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Identity {
    /// Whether this identity was provisioned through an OAuth2 provider.
    pub fn is_federated(&self) -> bool {
        !self.provider.is_empty()
    }

    /// Locale used for the access-token claim.
    pub fn locale(&self) -> Locale {
        self.preferred_language.unwrap_or_default()
    }

    pub fn profile(&self) -> UserProfile {
        UserProfile::from(self)
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("phone", &self.phone)
            .field(
                "password_hash",
                &self.password_hash.as_ref().map(|_| "[redacted]"),
            )
            .field("is_verified", &self.is_verified)
            .field("provider", &self.provider)
            .finish_non_exhaustive()
    }
}

/// Identity fields supplied at creation time; the store assigns the id.
#[derive(Clone)]
pub struct NewIdentity {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub password_hash: Option<String>,
    pub is_verified: bool,
    pub provider: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub profile_picture: Option<String>,
    pub preferred_language: Option<Locale>,
}

/// Sanitized view of an identity, safe to serialize to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub profile_picture: Option<String>,
    pub preferred_language: Locale,
    pub is_verified: bool,
    pub provider: String,
}

impl From<&Identity> for UserProfile {
    fn from(identity: &Identity) -> Self {
        Self {
            id: identity.id.clone(),
            email: identity.email.clone(),
            phone: identity.phone.clone(),
            first_name: identity.first_name.clone(),
            last_name: identity.last_name.clone(),
            profile_picture: identity.profile_picture.clone(),
            preferred_language: identity.locale(),
            is_verified: identity.is_verified,
            provider: identity.provider.clone(),
        }
    }
}

// =============================================================================
// Inputs
// =============================================================================

/// Password-path registration input.
#[derive(Clone, Default, Deserialize)]
pub struct NewAccount {
    pub email: String,
    pub password: String,
    /// One-time code previously sent to `email`.
    pub otp: String,
    pub phone: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub preferred_language: Option<Locale>,
}

impl fmt::Debug for NewAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewAccount")
            .field("email", &self.email)
            .field("phone", &self.phone)
            .finish_non_exhaustive()
    }
}

/// Password login input. `identifier` is an email address or a phone number.
#[derive(Clone, Deserialize)]
pub struct Credentials {
    pub identifier: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("identifier", &self.identifier)
            .finish_non_exhaustive()
    }
}

/// Profile returned by an OAuth2 provider, normalized to the local shape.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OAuthProfile {
    /// Provider name, e.g. `"google"`.
    pub provider: String,
    /// The provider's own account identifier.
    pub subject: String,
    pub email: Option<String>,
    pub email_verified: bool,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub picture: Option<String>,
}
