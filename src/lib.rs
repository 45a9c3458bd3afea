//! mescheck: L2 to MES Message Queue Monitor
//!
//! A single-shot threshold monitor. Each run counts pending messages in the
//! `mes_send` table over a trailing time window, alerts when the count
//! reaches the configured threshold, and reports a machine-readable outcome
//! to the automation host. Scheduling is left to the caller (a cron-style
//! workflow trigger runs the binary once per interval).
//!
//! # Features
//!
//! - **Metric Sources**: Oracle (`oracle-db` feature) and SQLite backends
//! - **Threshold Decision**: `count >= threshold` alerts, defaults to 100
//! - **Best-Effort Notification**: SMTP email plus an optional webhook;
//!   delivery failures never change the check result
//! - **Outcome Records**: `key=value` lines appended to `GITHUB_OUTPUT`
//! - **Bounded I/O**: every query and delivery runs under a timeout
//!
//! # Example
//!
//! ```no_run
//! use mescheck::alerts::{AlertChecker, ChannelNotifier};
//! use mescheck::config::MonitorConfig;
//! use mescheck::report::GithubOutput;
//!
//! # async fn run() {
//! let config = MonitorConfig::from_env();
//! let source = mescheck::source::from_config(&config);
//! let notifier = ChannelNotifier::from_config(&config);
//! let sink = GithubOutput::new(config.output_path.clone());
//!
//! let outcome = AlertChecker::new(&config, source.as_ref(), &notifier, &sink).run().await;
//! std::process::exit(outcome.status.exit_code().into());
//! # }
//! ```

pub mod alerts;
pub mod config;
pub mod report;
pub mod runtime;
pub mod source;

// Re-export commonly used types
pub use alerts::{AlertChecker, CheckStatus, RunOutcome};
pub use config::{ConfigError, MonitorConfig};
pub use report::OutcomeRecord;
pub use source::{MetricSource, SourceError};
