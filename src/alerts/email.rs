//! SMTP delivery over STARTTLS

use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use super::config::AlertMessage;
use super::notifier::{Notifier, NotifierError};
use crate::config::SmtpSettings;

/// Fully specified SMTP settings
struct SmtpConfig<'a> {
    server: &'a str,
    port: u16,
    user: &'a str,
    password: &'a str,
    from: &'a str,
    to: &'a str,
}

impl<'a> SmtpConfig<'a> {
    fn resolve(settings: &'a SmtpSettings) -> Result<Self, NotifierError> {
        match (
            &settings.server,
            &settings.user,
            &settings.password,
            &settings.from,
            &settings.to,
        ) {
            (Some(server), Some(user), Some(password), Some(from), Some(to)) => Ok(Self {
                server,
                port: settings.port,
                user,
                password,
                from,
                to,
            }),
            _ => Err(NotifierError::NotConfigured(settings.missing_keys())),
        }
    }
}

/// Split a comma-separated recipient list into mailboxes
pub fn parse_recipients(raw: &str) -> Result<Vec<Mailbox>, NotifierError> {
    let recipients = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(parse_mailbox)
        .collect::<Result<Vec<_>, _>>()?;

    if recipients.is_empty() {
        return Err(NotifierError::NoRecipients);
    }
    Ok(recipients)
}

fn parse_mailbox(address: &str) -> Result<Mailbox, NotifierError> {
    address.parse::<Mailbox>().map_err(|e| NotifierError::Address {
        address: address.to_string(),
        reason: e.to_string(),
    })
}

/// Compose the alert email
fn build_message(
    from: Mailbox,
    to: &[Mailbox],
    alert: &AlertMessage,
) -> Result<Message, NotifierError> {
    let mut builder = Message::builder().from(from).subject(alert.subject());
    for mailbox in to {
        builder = builder.to(mailbox.clone());
    }

    builder
        .header(ContentType::TEXT_PLAIN)
        .body(alert.body())
        .map_err(|e| NotifierError::Email(format!("Failed to build message: {}", e)))
}

/// Send `alert` to every configured recipient in one SMTP session.
/// Returns the recipient addresses on success.
pub async fn send_email(
    settings: &SmtpSettings,
    alert: &AlertMessage,
    timeout: Duration,
) -> Result<Vec<String>, NotifierError> {
    let config = SmtpConfig::resolve(settings)?;
    let recipients = parse_recipients(config.to)?;
    let from = parse_mailbox(config.from)?;
    let message = build_message(from, &recipients, alert)?;

    let credentials = Credentials::new(config.user.to_string(), config.password.to_string());
    let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(config.server)
        .map_err(|e| {
            NotifierError::Email(format!("Invalid SMTP relay {}: {}", config.server, e))
        })?
        .port(config.port)
        .credentials(credentials)
        .timeout(Some(timeout))
        .build();

    tokio::time::timeout(timeout, mailer.send(message))
        .await
        .map_err(|_| NotifierError::Timeout(timeout))?
        .map_err(|e| NotifierError::Email(format!("SMTP delivery failed: {}", e)))?;

    Ok(recipients.iter().map(|m| m.email.to_string()).collect())
}

/// Email channel over the configured SMTP relay
pub struct EmailNotifier {
    settings: SmtpSettings,
    timeout: Duration,
}

impl EmailNotifier {
    pub fn new(settings: SmtpSettings, timeout: Duration) -> Self {
        Self { settings, timeout }
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    fn kind(&self) -> &'static str {
        "email"
    }

    async fn notify(&self, message: &AlertMessage) -> Result<(), NotifierError> {
        let recipients = send_email(&self.settings, message, self.timeout).await?;
        tracing::info!(
            metric = %message.metric_name,
            recipients = %recipients.join(", "),
            "Email alert sent"
        );
        Ok(())
    }
}
