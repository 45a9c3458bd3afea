//! Threshold alerting
//!
//! The checker reads one metric, compares it against the configured
//! threshold and hands any alert to the notifier.

pub mod checker;
pub mod config;
pub mod email;
pub mod notifier;

pub use checker::{AlertChecker, AlertDecision, CheckError, CheckStatus, RunOutcome};
pub use config::AlertMessage;
pub use email::EmailNotifier;
pub use notifier::{
    send_alert, ChannelNotifier, NotificationAttempt, Notifier, NotifierError, WebhookNotifier,
};
