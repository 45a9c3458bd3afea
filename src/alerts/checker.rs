//! Single-shot threshold check
//!
//! One run moves through: validate configuration, read the metric, decide,
//! notify when triggered, report. Configuration and metric errors divert to
//! the failed-check path, which still reports exactly one outcome record and
//! makes one best-effort notification.

use chrono::{DateTime, SecondsFormat, Utc};

use super::config::AlertMessage;
use super::notifier::{send_alert, Notifier};
use crate::config::{ConfigError, MonitorConfig};
use crate::report::{OutcomeRecord, ResultSink, CHECK_FAILED_METRIC};
use crate::source::{MetricQuery, MetricReading, MetricSource, SourceError};

/// Threshold decision for one reading
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertDecision {
    pub triggered: bool,
    pub metric: MetricReading,
    pub threshold: u64,
}

impl AlertDecision {
    /// Reaching the threshold counts as exceeding it
    pub fn evaluate(metric: MetricReading, threshold: u64) -> Self {
        Self {
            triggered: metric.value >= threshold,
            metric,
            threshold,
        }
    }
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    /// The metric was read and evaluated, whether or not it alerted
    Completed,
    /// Configuration or metric retrieval failed
    Failed,
}

impl CheckStatus {
    pub fn exit_code(&self) -> u8 {
        match self {
            CheckStatus::Completed => 0,
            CheckStatus::Failed => 1,
        }
    }
}

/// Outcome of one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub status: CheckStatus,
    pub record: OutcomeRecord,
}

/// Drives one check from configuration to reported outcome
pub struct AlertChecker<'a> {
    config: &'a MonitorConfig,
    source: &'a dyn MetricSource,
    notifier: &'a dyn Notifier,
    sink: &'a dyn ResultSink,
}

impl<'a> AlertChecker<'a> {
    pub fn new(
        config: &'a MonitorConfig,
        source: &'a dyn MetricSource,
        notifier: &'a dyn Notifier,
        sink: &'a dyn ResultSink,
    ) -> Self {
        Self {
            config,
            source,
            notifier,
            sink,
        }
    }

    /// Run the check. Never fails: every error ends in a reported outcome.
    pub async fn run(&self) -> RunOutcome {
        let outcome = match self.check().await {
            Ok(decision) => self.complete(decision).await,
            Err(e) => self.fail(e).await,
        };

        if let Err(e) = self.sink.record(&outcome.record) {
            tracing::error!(error = %e, "Failed to record outcome");
        }

        let record = &outcome.record;
        tracing::debug!(
            record = %serde_json::to_string(record).unwrap_or_default(),
            "Outcome record"
        );
        tracing::info!(
            "Final: {}={}, threshold={}, alert={}, email_sent={}",
            record.metric_name,
            record.metric_value,
            record.threshold,
            record.alert,
            record.email_sent
        );
        outcome
    }

    /// Validate configuration, read the metric, and decide
    async fn check(&self) -> Result<AlertDecision, CheckError> {
        let db = self.config.database.validate()?;
        let query = MetricQuery::pending_messages(self.config.window_minutes);

        tracing::debug!(
            backend = self.source.backend(),
            window_minutes = query.window_minutes(),
            "Reading metric"
        );
        let value = self.source.read_metric(&query, &db).await?;

        let reading = MetricReading::new(self.config.metric_name(), value);
        Ok(AlertDecision::evaluate(reading, self.config.threshold.value))
    }

    async fn complete(&self, decision: AlertDecision) -> RunOutcome {
        let utc_time = iso_utc(decision.metric.observed_at);

        tracing::info!(
            "Messages currently on status {}: {}",
            self.config.status_label,
            decision.metric.value
        );
        tracing::info!("Threshold: {}", decision.threshold);
        tracing::info!("Alert triggered: {}", decision.triggered);

        let email_sent = if decision.triggered {
            let message = AlertMessage::new(
                decision.metric.name.clone(),
                decision.metric.value,
                decision.threshold,
                utc_time.clone(),
            );
            send_alert(self.notifier, &message).await.was_sent
        } else {
            tracing::info!("No alert needed - message count is below threshold");
            false
        };

        RunOutcome {
            status: CheckStatus::Completed,
            record: OutcomeRecord {
                alert: decision.triggered,
                metric_name: decision.metric.name,
                metric_value: decision.metric.value,
                threshold: decision.threshold,
                utc_time,
                email_sent,
            },
        }
    }

    async fn fail(&self, error: CheckError) -> RunOutcome {
        let threshold = self.config.threshold.value;
        let utc_time = iso_utc(Utc::now());

        tracing::error!(error = %error, "Check failed");

        let message = AlertMessage::new(CHECK_FAILED_METRIC, 0, threshold, utc_time.clone())
            .with_detail(error.to_string());
        let attempt = send_alert(self.notifier, &message).await;

        RunOutcome {
            status: CheckStatus::Failed,
            record: OutcomeRecord::check_failed(threshold, utc_time, attempt.was_sent),
        }
    }
}

/// ISO-8601 with microseconds and a `+00:00` offset
pub fn iso_utc(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Micros, false)
}

/// Errors that end a check on the failed path
#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Source(#[from] SourceError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::notifier::tests::{serve_once, webhook, StaticNotifier};
    use crate::alerts::notifier::{ChannelNotifier, NotifierError};
    use crate::config::DatabaseConfig;
    use crate::report::SinkError;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    enum Reading {
        Value(u64),
        ConnectionRefused,
    }

    struct FakeSource {
        reading: Reading,
        calls: AtomicUsize,
    }

    impl FakeSource {
        fn value(value: u64) -> Self {
            Self {
                reading: Reading::Value(value),
                calls: AtomicUsize::new(0),
            }
        }

        fn refusing() -> Self {
            Self {
                reading: Reading::ConnectionRefused,
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl MetricSource for FakeSource {
        fn backend(&self) -> &'static str {
            "fake"
        }

        async fn read_metric(
            &self,
            _query: &MetricQuery,
            _db: &DatabaseConfig,
        ) -> Result<u64, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.reading {
                Reading::Value(v) => Ok(v),
                Reading::ConnectionRefused => Err(SourceError::Connect(
                    "ORA-12541: TNS:no listener".to_string(),
                )),
            }
        }
    }

    struct FakeNotifier {
        ok: bool,
        sent: Mutex<Vec<AlertMessage>>,
    }

    impl FakeNotifier {
        fn new(ok: bool) -> Self {
            Self {
                ok,
                sent: Mutex::new(Vec::new()),
            }
        }

        fn sent(&self) -> Vec<AlertMessage> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Notifier for FakeNotifier {
        fn kind(&self) -> &'static str {
            "fake"
        }

        async fn notify(&self, message: &AlertMessage) -> Result<(), NotifierError> {
            self.sent.lock().unwrap().push(message.clone());
            if self.ok {
                Ok(())
            } else {
                Err(NotifierError::Email("connection refused".to_string()))
            }
        }
    }

    #[derive(Default)]
    struct MemorySink {
        records: Mutex<Vec<OutcomeRecord>>,
        broken: bool,
    }

    impl ResultSink for MemorySink {
        fn record(&self, outcome: &OutcomeRecord) -> Result<(), SinkError> {
            if self.broken {
                return Err(SinkError::Io(std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    "read-only",
                )));
            }
            self.records.lock().unwrap().push(outcome.clone());
            Ok(())
        }
    }

    fn config(threshold: Option<&str>) -> MonitorConfig {
        let mut vars: HashMap<&str, &str> = HashMap::from([
            ("ORACLE_USER", "monitor"),
            ("ORACLE_PASSWORD", "secret"),
            ("ORACLE_DSN", "db:1521/MES"),
        ]);
        if let Some(threshold) = threshold {
            vars.insert("THRESHOLD_VALUE", threshold);
        }
        MonitorConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()))
    }

    async fn run(
        config: &MonitorConfig,
        source: &FakeSource,
        notifier: &dyn Notifier,
    ) -> (RunOutcome, Vec<OutcomeRecord>) {
        let sink = MemorySink::default();
        let outcome = AlertChecker::new(config, source, notifier, &sink).run().await;
        let records = sink.records.lock().unwrap().clone();
        (outcome, records)
    }

    #[test]
    fn test_decision_boundary() {
        for threshold in 0..20u64 {
            for value in 0..20u64 {
                let decision = AlertDecision::evaluate(MetricReading::new("m", value), threshold);
                assert_eq!(
                    decision.triggered,
                    value >= threshold,
                    "value={} threshold={}",
                    value,
                    threshold
                );
            }
        }
        assert!(AlertDecision::evaluate(MetricReading::new("m", 100), 100).triggered);
        assert!(AlertDecision::evaluate(MetricReading::new("m", 0), 0).triggered);
    }

    #[tokio::test]
    async fn test_over_threshold_alerts() {
        let config = config(Some("100"));
        let source = FakeSource::value(150);
        let notifier = FakeNotifier::new(true);

        let (outcome, records) = run(&config, &source, &notifier).await;

        assert_eq!(outcome.status, CheckStatus::Completed);
        assert_eq!(outcome.status.exit_code(), 0);
        assert!(outcome.record.alert);
        assert_eq!(outcome.record.metric_name, "L2_TO_MES_MESSAGES_STATUS_0_LAST_10_MIN");
        assert_eq!(outcome.record.metric_value, 150);
        assert_eq!(outcome.record.threshold, 100);
        assert!(outcome.record.email_sent);
        assert_eq!(records, vec![outcome.record.clone()]);

        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].metric_value, 150);
        assert_eq!(sent[0].utc_time, outcome.record.utc_time);
    }

    #[tokio::test]
    async fn test_failed_delivery_still_completes() {
        let config = config(Some("100"));
        let source = FakeSource::value(150);
        let notifier = FakeNotifier::new(false);

        let (outcome, _) = run(&config, &source, &notifier).await;

        assert_eq!(outcome.status, CheckStatus::Completed);
        assert!(outcome.record.alert);
        assert!(!outcome.record.email_sent);
    }

    #[tokio::test]
    async fn test_webhook_failure_keeps_email_sent() {
        let config = config(Some("100"));
        let source = FakeSource::value(150);
        let (url, server) = serve_once("500 Internal Server Error").await;
        let email = Box::new(StaticNotifier { ok: true });
        let notifier = ChannelNotifier::new(email, Some(webhook(url)));

        let (outcome, _) = run(&config, &source, &notifier).await;

        assert!(outcome.record.alert);
        assert!(outcome.record.email_sent);
        assert!(!server.await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_under_threshold_does_not_notify() {
        let config = config(Some("100"));
        let source = FakeSource::value(50);
        let notifier = FakeNotifier::new(true);

        let (outcome, records) = run(&config, &source, &notifier).await;

        assert_eq!(outcome.status, CheckStatus::Completed);
        assert!(!outcome.record.alert);
        assert_eq!(outcome.record.metric_value, 50);
        assert_eq!(outcome.record.threshold, 100);
        assert!(!outcome.record.email_sent);
        assert!(notifier.sent().is_empty());
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn test_at_threshold_alerts() {
        let config = config(Some("50"));
        let source = FakeSource::value(50);
        let notifier = FakeNotifier::new(true);

        let (outcome, _) = run(&config, &source, &notifier).await;
        assert!(outcome.record.alert);
        assert_eq!(notifier.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_threshold_uses_default() {
        let config = config(Some("abc"));
        let source = FakeSource::value(120);
        let notifier = FakeNotifier::new(true);

        let (outcome, _) = run(&config, &source, &notifier).await;
        assert_eq!(outcome.record.threshold, 100);
        assert!(outcome.record.alert);
    }

    #[tokio::test]
    async fn test_source_failure_reports_sentinel() {
        let config = config(Some("80"));
        let source = FakeSource::refusing();

        let notifier = FakeNotifier::new(true);
        let (outcome, records) = run(&config, &source, &notifier).await;

        assert_eq!(outcome.status, CheckStatus::Failed);
        assert_eq!(outcome.status.exit_code(), 1);
        assert!(outcome.record.alert);
        assert_eq!(outcome.record.metric_name, "ORACLE_CHECK_FAILED");
        assert_eq!(outcome.record.metric_value, 0);
        assert_eq!(outcome.record.threshold, 80);
        assert!(outcome.record.email_sent);
        assert_eq!(records.len(), 1);

        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].metric_name, "ORACLE_CHECK_FAILED");
        assert!(sent[0].detail.as_deref().unwrap_or_default().contains("TNS:no listener"));

        let notifier = FakeNotifier::new(false);
        let (outcome, _) = run(&config, &source, &notifier).await;
        assert_eq!(outcome.status, CheckStatus::Failed);
        assert!(!outcome.record.email_sent);
    }

    #[tokio::test]
    async fn test_missing_credentials_skip_query() {
        let config =
            MonitorConfig::from_lookup(|key| (key == "ORACLE_USER").then(|| "monitor".to_string()));
        let source = FakeSource::value(500);
        let notifier = FakeNotifier::new(false);

        let (outcome, records) = run(&config, &source, &notifier).await;

        assert_eq!(source.calls(), 0);
        assert_eq!(outcome.status.exit_code(), 1);
        assert_eq!(outcome.record.metric_name, "ORACLE_CHECK_FAILED");
        assert_eq!(outcome.record.threshold, 100);
        assert_eq!(records.len(), 1);

        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        let detail = sent[0].detail.as_deref().unwrap_or_default();
        assert!(detail.contains("ORACLE_PASSWORD, ORACLE_DSN"));
    }

    #[tokio::test]
    async fn test_repeated_runs_match() {
        let config = config(None);
        let source = FakeSource::value(150);
        let notifier = FakeNotifier::new(true);

        let (first, _) = run(&config, &source, &notifier).await;
        let (second, _) = run(&config, &source, &notifier).await;

        let strip = |mut record: OutcomeRecord| {
            record.utc_time.clear();
            record
        };
        assert_eq!(strip(first.record), strip(second.record));
        assert_eq!(first.status, second.status);
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_sink_failure_does_not_change_status() {
        let config = config(None);
        let source = FakeSource::value(10);
        let notifier = FakeNotifier::new(true);
        let sink = MemorySink {
            broken: true,
            ..MemorySink::default()
        };

        let outcome = AlertChecker::new(&config, &source, &notifier, &sink).run().await;
        assert_eq!(outcome.status, CheckStatus::Completed);
    }

    #[test]
    fn test_iso_utc_format() {
        let time = DateTime::parse_from_rfc3339("2024-05-01T10:00:00.5Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(iso_utc(time), "2024-05-01T10:00:00.500000+00:00");
    }
}
