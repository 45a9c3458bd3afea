//! Outcome records and the sink that hands them to the automation host

pub mod output;

use serde::Serialize;

pub use output::{GithubOutput, SinkError};

/// Metric name reported when the check itself could not complete
pub const CHECK_FAILED_METRIC: &str = "ORACLE_CHECK_FAILED";

/// Structured result of one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutcomeRecord {
    pub alert: bool,
    pub metric_name: String,
    pub metric_value: u64,
    pub threshold: u64,
    /// ISO-8601 UTC timestamp
    pub utc_time: String,
    pub email_sent: bool,
}

impl OutcomeRecord {
    /// Record for a check that could not read its metric
    pub fn check_failed(threshold: u64, utc_time: impl Into<String>, email_sent: bool) -> Self {
        Self {
            alert: true,
            metric_name: CHECK_FAILED_METRIC.to_string(),
            metric_value: 0,
            threshold,
            utc_time: utc_time.into(),
            email_sent,
        }
    }

    /// Fields in reporting order, rendered as the host expects them
    pub fn fields(&self) -> [(&'static str, String); 6] {
        [
            ("alert", self.alert.to_string()),
            ("metric_name", self.metric_name.clone()),
            ("metric_value", self.metric_value.to_string()),
            ("threshold", self.threshold.to_string()),
            ("utc_time", self.utc_time.clone()),
            ("email_sent", self.email_sent.to_string()),
        ]
    }
}

/// Receives the outcome of a run
pub trait ResultSink {
    fn record(&self, outcome: &OutcomeRecord) -> Result<(), SinkError>;
}
