//! Email delivery over SMTP.

use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::info;

use super::{Notifier, NotifyError};
use crate::models::ContactPoint;

/// SMTP relay settings.
#[derive(Clone)]
pub struct SmtpConfig {
    pub host: String,
    /// 587 for STARTTLS.
    pub port: u16,
    /// Empty for relays that accept unauthenticated mail.
    pub username: String,
    pub password: String,
    /// Sender, e.g. `JobMate <no-reply@jobmate.et>`.
    pub from: String,
}

impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("from", &self.from)
            .finish_non_exhaustive()
    }
}

/// Sends verification codes by email through a STARTTLS relay.
///
/// Phone destinations are not supported.
#[derive(Clone)]
pub struct SmtpNotifier {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpNotifier {
    /// Build the transport. No connection is made until the first send.
    pub fn new(config: SmtpConfig) -> Result<Self, NotifyError> {
        let from: Mailbox = config
            .from
            .parse()
            .map_err(|e| NotifyError::Config(format!("invalid sender '{}': {e}", config.from)))?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| NotifyError::Config(format!("SMTP relay {}: {e}", config.host)))?
            .port(config.port);
        if !config.username.is_empty() {
            builder = builder.credentials(Credentials::new(config.username, config.password));
        }

        info!(host = %config.host, port = config.port, "SMTP notifier configured");
        Ok(Self {
            mailer: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(
        &self,
        destination: &ContactPoint,
        subject: &str,
        body: &str,
    ) -> Result<(), NotifyError> {
        let ContactPoint::Email(address) = destination else {
            return Err(NotifyError::Unsupported(destination.to_string()));
        };
        let to: Mailbox = address
            .parse()
            .map_err(|e| NotifyError::Delivery(format!("invalid recipient: {e}")))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| NotifyError::Delivery(format!("build message: {e}")))?;

        self.mailer
            .send(message)
            .await
            .map_err(|e| NotifyError::Delivery(e.to_string()))?;
        Ok(())
    }
}
