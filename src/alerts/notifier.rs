//! Notification delivery for alerts
//!
//! [`send_alert`] is the only entry point the check pipeline uses. It makes
//! one delivery attempt and turns every failure into `was_sent = false`, so a
//! notification problem can never change the outcome of a check.

use std::time::Duration;

use async_trait::async_trait;

use super::config::AlertMessage;
use super::email::EmailNotifier;
use crate::config::MonitorConfig;

/// Something that can deliver an alert
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Channel name, for logging
    fn kind(&self) -> &'static str;

    async fn notify(&self, message: &AlertMessage) -> Result<(), NotifierError>;
}

/// Result of one best-effort delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationAttempt {
    pub was_sent: bool,
}

/// Try once, discard failure: deliver `message` and report whether it went
/// out. Errors are logged and never returned.
pub async fn send_alert(notifier: &dyn Notifier, message: &AlertMessage) -> NotificationAttempt {
    match notifier.notify(message).await {
        Ok(()) => NotificationAttempt { was_sent: true },
        Err(e) => {
            tracing::error!(
                metric = %message.metric_name,
                error = %e,
                "Failed to send alert notification"
            );
            NotificationAttempt { was_sent: false }
        }
    }
}

/// Email plus an optional webhook mirror.
///
/// Only the email delivery decides the result; a webhook failure is logged
/// and does not affect `email_sent`.
pub struct ChannelNotifier {
    email: Box<dyn Notifier>,
    webhook: Option<Box<dyn Notifier>>,
}

impl ChannelNotifier {
    pub fn new(email: Box<dyn Notifier>, webhook: Option<Box<dyn Notifier>>) -> Self {
        Self { email, webhook }
    }

    /// Email is always present, so that missing SMTP settings surface as a
    /// failed delivery. The webhook is added when `ALERT_WEBHOOK_URL` is set
    /// and its HTTP client could be built.
    pub fn from_config(config: &MonitorConfig) -> Self {
        let email = EmailNotifier::new(config.smtp.clone(), config.notify_timeout);

        let webhook = config.webhook_url.as_ref().and_then(|url| {
            match WebhookNotifier::new(url.clone(), config.notify_timeout) {
                Ok(webhook) => Some(Box::new(webhook) as Box<dyn Notifier>),
                Err(e) => {
                    tracing::error!(error = %e, "Webhook notifications disabled");
                    None
                }
            }
        });

        Self::new(Box::new(email), webhook)
    }

    pub fn has_webhook(&self) -> bool {
        self.webhook.is_some()
    }
}

#[async_trait]
impl Notifier for ChannelNotifier {
    fn kind(&self) -> &'static str {
        self.email.kind()
    }

    async fn notify(&self, message: &AlertMessage) -> Result<(), NotifierError> {
        let result = self.email.notify(message).await;

        if let Some(webhook) = &self.webhook {
            if let Err(e) = webhook.notify(message).await {
                tracing::warn!(channel = webhook.kind(), error = %e, "Notification target failed");
            }
        }

        result
    }
}

/// Posts the alert as JSON to an HTTP endpoint
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: String, timeout: Duration) -> Result<Self, NotifierError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotifierError::Webhook(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    fn kind(&self) -> &'static str {
        "webhook"
    }

    async fn notify(&self, message: &AlertMessage) -> Result<(), NotifierError> {
        let payload = serde_json::json!({
            "subject": message.subject(),
            "text": message.body(),
            "alert": message,
        });

        let response = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| NotifierError::Webhook(format!("Failed to send webhook: {}", e)))?;

        if !response.status().is_success() {
            return Err(NotifierError::Webhook(format!(
                "Webhook returned status {}",
                response.status()
            )));
        }

        tracing::debug!(
            metric = %message.metric_name,
            url = %self.url,
            "Webhook notification sent"
        );

        Ok(())
    }
}

/// Notifier errors
#[derive(Debug, thiserror::Error)]
pub enum NotifierError {
    #[error("Email transport not configured, missing: {}", .0.join(", "))]
    NotConfigured(Vec<&'static str>),

    #[error("Recipient list is empty")]
    NoRecipients,

    #[error("Invalid address '{address}': {reason}")]
    Address { address: String, reason: String },

    #[error("Email error: {0}")]
    Email(String),

    #[error("Webhook error: {0}")]
    Webhook(String),

    #[error("Notification timed out after {0:?}")]
    Timeout(Duration),
}
