//! Oracle metric source
//!
//! The Oracle client library is loaded once per process by
//! [`OracleClient::initialize`]. The returned handle is passed into
//! [`OracleSource`] so that no connection is attempted before that step ran.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;

use super::query::{Dialect, MetricQuery};
use super::{coerce_count, run_blocking, MetricSource, SourceError};
use crate::config::DatabaseConfig;

/// How the Oracle client library was located
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMode {
    /// Loaded from an explicit directory
    LibDir(PathBuf),
    /// Loaded from the platform library search path
    SearchPath,
    /// Initialization failed; the driver retries lazily on first connect
    Deferred,
}

/// Handle proving the client library initialization step has run
#[derive(Debug, Clone)]
pub struct OracleClient {
    mode: ClientMode,
}

impl OracleClient {
    /// Initialize the client library. Falls back from `lib_dir` to the default
    /// search path, and from there to lazy initialization, logging each step.
    pub fn initialize(lib_dir: Option<&Path>) -> Self {
        if let Some(dir) = lib_dir {
            let mut params = oracle::InitParams::new();
            let result = params
                .oracle_client_lib_dir(dir)
                .and_then(|params| params.init());
            match result {
                Ok(_) => {
                    tracing::info!(lib_dir = %dir.display(), "Oracle client initialized");
                    return Self {
                        mode: ClientMode::LibDir(dir.to_path_buf()),
                    };
                }
                Err(e) => tracing::warn!(
                    lib_dir = %dir.display(),
                    error = %e,
                    "Could not initialize Oracle client from directory, trying default search path"
                ),
            }
        }

        match oracle::InitParams::new().init() {
            Ok(_) => {
                tracing::info!("Oracle client initialized from default search path");
                Self {
                    mode: ClientMode::SearchPath,
                }
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "Could not initialize Oracle client, deferring to first connect"
                );
                Self {
                    mode: ClientMode::Deferred,
                }
            }
        }
    }

    pub fn mode(&self) -> &ClientMode {
        &self.mode
    }
}

/// Reads the metric from Oracle
pub struct OracleSource {
    client: OracleClient,
    timeout: Duration,
}

impl OracleSource {
    pub fn new(client: OracleClient, timeout: Duration) -> Self {
        Self { client, timeout }
    }
}

#[async_trait]
impl MetricSource for OracleSource {
    fn backend(&self) -> &'static str {
        "oracle"
    }

    async fn read_metric(
        &self,
        query: &MetricQuery,
        db: &DatabaseConfig,
    ) -> Result<u64, SourceError> {
        let sql = query.sql(Dialect::Oracle);
        let db = db.clone();
        let call_timeout = self.timeout;

        tracing::info!(
            dsn = %db.dsn,
            user = %db.user,
            client = ?self.client.mode(),
            "Connecting to Oracle database"
        );
        run_blocking(self.timeout, move || count(&db, &sql, call_timeout)).await
    }
}

fn count(db: &DatabaseConfig, sql: &str, call_timeout: Duration) -> Result<u64, SourceError> {
    let conn = oracle::Connection::connect(&db.user, &db.password, &db.dsn)
        .map_err(|e| SourceError::Connect(e.to_string()))?;

    match conn.server_version() {
        Ok((version, _banner)) => {
            tracing::info!(version = %version, "Connected to Oracle database")
        }
        Err(e) => tracing::debug!(error = %e, "Could not read server version"),
    }

    conn.set_call_timeout(Some(call_timeout))
        .map_err(|e| SourceError::Connect(e.to_string()))?;

    let raw = conn
        .query_row_as::<Option<i64>>(sql, &[])
        .map_err(|e| SourceError::Query(e.to_string()))?;

    coerce_count(raw)
}
