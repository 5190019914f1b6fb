//! API server configuration.

use std::time::Duration;

use jobmate_core::auth::jwt::resolve_secret;
use jobmate_core::config::{AuthConfig, TokenConfig};
use jobmate_core::notify::SmtpConfig;
use jobmate_core::oauth::GoogleConfig;

const MINUTE: u64 = 60;
const DAY: u64 = 24 * 60 * MINUTE;
/// Upper bounds for configured token lifetimes.
const MAX_ACCESS_TOKEN_TTL: Duration = Duration::from_secs(DAY);
const MAX_REFRESH_TOKEN_TTL: Duration = Duration::from_secs(365 * DAY);

/// Configuration for the API server.
#[derive(Clone)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:8080").
    pub bind_addr: String,
    /// PostgreSQL connection URL.
    pub pg_connection_url: String,
    pub access_token_secret: String,
    pub refresh_token_secret: String,
    pub access_token_ttl: Duration,
    /// Lifetime of a stored refresh session.
    pub refresh_token_ttl: Duration,
    /// Mark auth cookies `Secure`. Disable only for plain-HTTP development.
    pub cookie_secure: bool,
    /// Google sign-in; `None` when no client id is configured.
    pub google: Option<GoogleConfig>,
    /// Outbound email; `None` when `SMTP_HOST` is unset.
    pub smtp: Option<SmtpConfig>,
}

impl ApiConfig {
    /// Reads configuration from environment variables with sensible defaults.
    ///
    /// | Variable                   | Default                                |
    /// |----------------------------|----------------------------------------|
    /// | `BIND_ADDR`                | `127.0.0.1:8080`                       |
    /// | `DATABASE_URL`             | `postgres://localhost:5432/jobmate`    |
    /// | `ACCESS_TOKEN_SECRET`      | generated & persisted to file          |
    /// | `REFRESH_TOKEN_SECRET`     | generated & persisted to file          |
    /// | `ACCESS_TOKEN_TTL_MINUTES` | `15`                                   |
    /// | `REFRESH_TOKEN_TTL_DAYS`   | `60`                                   |
    /// | `COOKIE_SECURE`            | `true`                                 |
    /// | `GOOGLE_CLIENT_ID`         | unset (Google sign-in disabled)        |
    /// | `GOOGLE_CLIENT_SECRET`     | empty                                  |
    /// | `GOOGLE_REDIRECT_URL`      | `http://localhost:8080/auth/oauth/google/callback` |
    /// | `SMTP_HOST`                | unset (codes are only logged)          |
    /// | `SMTP_PORT`                | `587`                                  |
    /// | `SMTP_USERNAME`            | empty (no authentication)              |
    /// | `SMTP_PASSWORD`            | empty                                  |
    /// | `EMAIL_FROM`               | `JobMate <no-reply@jobmate.local>`     |
    ///
    /// Token lifetimes are capped at one day (access) and one year (refresh).
    pub fn from_env() -> Self {
        let bind_addr = env_or("BIND_ADDR", "127.0.0.1:8080");
        let google = std::env::var("GOOGLE_CLIENT_ID")
            .ok()
            .filter(|id| !id.is_empty())
            .map(|client_id| {
                GoogleConfig::new(
                    client_id,
                    env_or("GOOGLE_CLIENT_SECRET", ""),
                    env_or(
                        "GOOGLE_REDIRECT_URL",
                        "http://localhost:8080/auth/oauth/google/callback",
                    ),
                )
            });

        Self {
            bind_addr,
            pg_connection_url: env_or("DATABASE_URL", "postgres://localhost:5432/jobmate"),
            access_token_secret: resolve_secret(&["ACCESS_TOKEN_SECRET"], "access-token.secret"),
            refresh_token_secret: resolve_secret(
                &["REFRESH_TOKEN_SECRET"],
                "refresh-token.secret",
            ),
            access_token_ttl: scaled_ttl(
                env_u64("ACCESS_TOKEN_TTL_MINUTES", 15),
                MINUTE,
                MAX_ACCESS_TOKEN_TTL,
            ),
            refresh_token_ttl: scaled_ttl(
                env_u64("REFRESH_TOKEN_TTL_DAYS", 60),
                DAY,
                MAX_REFRESH_TOKEN_TTL,
            ),
            cookie_secure: env_bool("COOKIE_SECURE", true),
            google,
            smtp: smtp_from_env(),
        }
    }

    /// Auth component configuration derived from this config.
    pub fn auth_config(&self) -> AuthConfig {
        let mut tokens = TokenConfig::new(&self.access_token_secret, &self.refresh_token_secret);
        tokens.access_ttl = self.access_token_ttl;
        tokens.refresh_session_ttl = self.refresh_token_ttl;
        AuthConfig::new(tokens)
    }
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("bind_addr", &self.bind_addr)
            .field("access_token_ttl", &self.access_token_ttl)
            .field("refresh_token_ttl", &self.refresh_token_ttl)
            .field("cookie_secure", &self.cookie_secure)
            .field("google", &self.google)
            .field("smtp", &self.smtp)
            .finish_non_exhaustive()
    }
}

fn smtp_from_env() -> Option<SmtpConfig> {
    let host = std::env::var("SMTP_HOST").ok().filter(|h| !h.trim().is_empty())?;
    Some(SmtpConfig {
        host,
        port: std::env::var("SMTP_PORT")
            .ok()
            .and_then(|p| p.trim().parse().ok())
            .unwrap_or(587),
        username: env_or("SMTP_USERNAME", ""),
        password: env_or("SMTP_PASSWORD", ""),
        from: env_or("EMAIL_FROM", "JobMate <no-reply@jobmate.local>"),
    })
}

/// `count` units of `unit_secs` seconds, saturating and capped at `max`.
fn scaled_ttl(count: u64, unit_secs: u64, max: Duration) -> Duration {
    Duration::from_secs(count.saturating_mul(unit_secs)).min(max)
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(v) => matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}
