//! Metric source: one aggregate query against the monitored data store
//!
//! A source opens one connection, runs exactly one query, and returns the
//! scalar result as a non-negative count. Errors are not handled here; the
//! check pipeline decides what a failed read means.

pub mod query;
pub mod sqlite;

#[cfg(feature = "oracle-db")]
pub mod oracle_db;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::config::{DatabaseConfig, DbBackend, MonitorConfig};

pub use query::{Dialect, MetricQuery};
pub use sqlite::SqliteSource;

#[cfg(feature = "oracle-db")]
pub use oracle_db::{ClientMode, OracleClient, OracleSource};

/// Reads a single count from a data store
#[async_trait]
pub trait MetricSource: Send + Sync {
    /// Backend name, for logging
    fn backend(&self) -> &'static str;

    /// Run `query` over a fresh connection described by `db`
    async fn read_metric(
        &self,
        query: &MetricQuery,
        db: &DatabaseConfig,
    ) -> Result<u64, SourceError>;
}

/// One observed metric value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricReading {
    pub name: String,
    pub value: u64,
    pub observed_at: DateTime<Utc>,
}

impl MetricReading {
    pub fn new(name: impl Into<String>, value: u64) -> Self {
        Self {
            name: name.into(),
            value,
            observed_at: Utc::now(),
        }
    }
}

/// Build the source selected by the configuration.
///
/// For Oracle this performs the one-time client library initialization, so
/// it must be called once, at startup.
pub fn from_config(config: &MonitorConfig) -> Box<dyn MetricSource> {
    match config.backend {
        DbBackend::Sqlite => Box::new(SqliteSource::new(config.db_timeout)),
        DbBackend::Oracle => oracle_source(config),
    }
}

#[cfg(feature = "oracle-db")]
fn oracle_source(config: &MonitorConfig) -> Box<dyn MetricSource> {
    let client = OracleClient::initialize(config.client_lib_dir.as_deref());
    Box::new(OracleSource::new(client, config.db_timeout))
}

#[cfg(not(feature = "oracle-db"))]
fn oracle_source(_config: &MonitorConfig) -> Box<dyn MetricSource> {
    Box::new(UnavailableSource {
        backend: DbBackend::Oracle,
    })
}

/// Stands in for a backend that was not compiled into this binary. Every read
/// fails, which sends the run down the failed-check path.
pub struct UnavailableSource {
    backend: DbBackend,
}

#[async_trait]
impl MetricSource for UnavailableSource {
    fn backend(&self) -> &'static str {
        self.backend.as_str()
    }

    async fn read_metric(
        &self,
        _query: &MetricQuery,
        _db: &DatabaseConfig,
    ) -> Result<u64, SourceError> {
        Err(SourceError::Unsupported(self.backend))
    }
}

/// Coerce a nullable driver count into a metric value
pub fn coerce_count(raw: Option<i64>) -> Result<u64, SourceError> {
    match raw {
        None => Ok(0),
        Some(n) => u64::try_from(n).map_err(|_| SourceError::InvalidValue(n)),
    }
}

/// Run a blocking driver call off the async runtime, bounded by `timeout`.
///
/// On timeout the blocking call is abandoned, not cancelled; it releases its
/// connection when the driver call returns.
pub(crate) async fn run_blocking<F>(timeout: Duration, f: F) -> Result<u64, SourceError>
where
    F: FnOnce() -> Result<u64, SourceError> + Send + 'static,
{
    let task = tokio::task::spawn_blocking(f);
    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => Err(SourceError::Task(e.to_string())),
        Err(_) => Err(SourceError::Timeout(timeout)),
    }
}

/// Metric source errors
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Connection error: {0}")]
    Connect(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Query returned a negative count: {0}")]
    InvalidValue(i64),

    #[error("Query did not complete within {0:?}")]
    Timeout(Duration),

    #[error("Query task failed: {0}")]
    Task(String),

    #[error("Backend '{0}' is not available in this build")]
    Unsupported(DbBackend),
}
