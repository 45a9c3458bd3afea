//! SQLite metric source, used for local development against a file copy of
//! the message table.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use rusqlite::{Connection, OpenFlags, OptionalExtension};

use super::query::{Dialect, MetricQuery};
use super::{coerce_count, run_blocking, MetricSource, SourceError};
use crate::config::DatabaseConfig;

/// Reads the metric from a SQLite database file named by the DSN
pub struct SqliteSource {
    timeout: Duration,
}

impl SqliteSource {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl MetricSource for SqliteSource {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    async fn read_metric(
        &self,
        query: &MetricQuery,
        db: &DatabaseConfig,
    ) -> Result<u64, SourceError> {
        let path = PathBuf::from(&db.dsn);
        let sql = query.sql(Dialect::Sqlite);
        let busy_timeout = self.timeout;

        tracing::info!(path = %path.display(), user = %db.user, "Opening SQLite database");
        run_blocking(self.timeout, move || count(&path, &sql, busy_timeout)).await
    }
}

/// Connection is dropped, and closed, on every return path
fn count(path: &Path, sql: &str, busy_timeout: Duration) -> Result<u64, SourceError> {
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|e| SourceError::Connect(e.to_string()))?;

    conn.busy_timeout(busy_timeout)
        .map_err(|e| SourceError::Connect(e.to_string()))?;

    let raw: Option<i64> = conn
        .query_row(sql, [], |row| row.get::<_, Option<i64>>(0))
        .optional()
        .map_err(|e| SourceError::Query(e.to_string()))?
        .flatten();

    coerce_count(raw)
}
