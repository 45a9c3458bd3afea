//! Alert message definition

use serde::Serialize;

/// A rendered alert, ready for delivery
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlertMessage {
    pub metric_name: String,
    pub metric_value: u64,
    pub threshold: u64,
    /// ISO-8601 UTC timestamp of the observation
    pub utc_time: String,
    /// Extra context, e.g. why the check failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl AlertMessage {
    pub fn new(
        metric_name: impl Into<String>,
        metric_value: u64,
        threshold: u64,
        utc_time: impl Into<String>,
    ) -> Self {
        Self {
            metric_name: metric_name.into(),
            metric_value,
            threshold,
            utc_time: utc_time.into(),
            detail: None,
        }
    }

    /// Attach extra context to the message body
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn subject(&self) -> String {
        format!("ALERT: {} Threshold Exceeded", self.metric_name)
    }

    pub fn body(&self) -> String {
        let mut body = format!(
            "Alert: Message Count Threshold Exceeded\n\
             \n\
             Metric: {}\n\
             Current Count: {}\n\
             Threshold: {}\n\
             Time (UTC): {}\n\
             \n\
             The number of messages with the specified status has reached the configured \
             threshold.\n\
             Please investigate the L2 to MES message processing system.\n",
            self.metric_name, self.metric_value, self.threshold, self.utc_time
        );

        if let Some(detail) = &self.detail {
            body.push_str(&format!("\nCheck error: {}\n", detail));
        }

        body.push_str("\nThis is an automated alert from the mescheck monitor.");
        body
    }
}
