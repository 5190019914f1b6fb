//! Outbound delivery of verification codes.
//!
//! Delivery is best-effort: callers log failures and carry on, so a caller
//! can never learn from the response whether a contact point is registered.

pub mod smtp;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::ContactPoint;

pub use smtp::{SmtpConfig, SmtpNotifier};

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Delivery to {0} is not supported")]
    Unsupported(String),

    #[error("Delivery failed: {0}")]
    Delivery(String),

    #[error("Notifier misconfigured: {0}")]
    Config(String),
}

/// Email/SMS transport.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(
        &self,
        destination: &ContactPoint,
        subject: &str,
        body: &str,
    ) -> Result<(), NotifyError>;
}

/// Development notifier that writes messages to the log.
///
/// Message bodies carry the code, so they are only logged at `debug`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(
        &self,
        destination: &ContactPoint,
        subject: &str,
        body: &str,
    ) -> Result<(), NotifyError> {
        tracing::info!(destination = %destination, subject, "Notification (log only)");
        tracing::debug!(destination = %destination, body, "Notification body");
        Ok(())
    }
}

/// Subject and body for a registration code.
pub fn registration_message(code: &str, valid_minutes: u64) -> (String, String) {
    (
        "Your JobMate verification code".to_string(),
        format!("Your verification code is {code}. It expires in {valid_minutes} minutes."),
    )
}
