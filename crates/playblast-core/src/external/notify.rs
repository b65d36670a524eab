//! Completion notices sent through a mail relay.

use crate::config::SmtpSettings;
use crate::error::{PlayblastError, Result};

/// A rendered message ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

impl Notification {
    /// Notice that a playblast finished.
    pub fn playblast_done(
        recipient: &str,
        user: &str,
        scene: &str,
        completed_at: &str,
        artifact_path: &str,
    ) -> Self {
        let body = format!(
            "Hello {user}.\n\
             Playblast of {scene} is done.\n\n\
             Completion date and time : {completed_at}\n\n\
             Playblast location : {artifact_path}"
        );
        Self {
            recipient: recipient.to_string(),
            subject: format!("Playblast : {scene}"),
            body,
        }
    }
}

/// Check an address locally before anything is handed to the relay.
///
/// Requires a non-empty local part, an `@`, and a domain containing a `.`
/// that is neither its first nor last character.
pub fn validate_recipient(address: &str) -> Result<()> {
    let invalid = || PlayblastError::InvalidRecipientAddress(address.to_string());
    let (local, domain) = address.trim().rsplit_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains(char::is_whitespace) {
        return Err(invalid());
    }
    match domain.find('.') {
        Some(i) if i > 0 && !domain.ends_with('.') => Ok(()),
        _ => Err(invalid()),
    }
}

/// Delivers notifications. Blocking; callers run it off the async executor.
pub trait Notifier: Send + Sync {
    fn send(&self, notification: &Notification) -> Result<()>;
}

/// Relay over SMTP without authentication, as studio relays usually are.
#[derive(Debug, Clone)]
pub struct SmtpNotifier {
    settings: SmtpSettings,
}

impl SmtpNotifier {
    pub fn new(settings: SmtpSettings) -> Self {
        Self { settings }
    }
}

impl Notifier for SmtpNotifier {
    fn send(&self, notification: &Notification) -> Result<()> {
        use lettre::{message::header::ContentType, Message, SmtpTransport, Transport};

        let email = Message::builder()
            .from(
                self.settings
                    .from
                    .parse()
                    .map_err(|e| PlayblastError::Notification(format!("invalid from address: {e}")))?,
            )
            .to(notification
                .recipient
                .parse()
                .map_err(|_| PlayblastError::InvalidRecipientAddress(notification.recipient.clone()))?)
            .subject(notification.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(notification.body.clone())
            .map_err(|e| PlayblastError::Notification(format!("failed to build message: {e}")))?;

        let mailer = SmtpTransport::builder_dangerous(&self.settings.host)
            .port(self.settings.port)
            .build();
        mailer
            .send(&email)
            .map_err(|e| PlayblastError::Notification(format!("relay {}: {e}", self.settings.host)))?;
        Ok(())
    }
}
