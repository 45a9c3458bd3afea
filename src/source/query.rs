//! The monitored count query

/// Table holding messages sent from L2 to MES
pub const MONITORED_TABLE: &str = "mes_send";

/// Status of a message that has not been picked up yet
pub const PENDING_STATUS: i64 = 0;

/// SQL dialect of the target data store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Oracle,
    Sqlite,
}

/// A parameterless count of pending rows inside a trailing time window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricQuery {
    table: &'static str,
    status: i64,
    window_minutes: u32,
}

impl MetricQuery {
    /// Count of pending messages created in the last `window_minutes`
    pub fn pending_messages(window_minutes: u32) -> Self {
        Self {
            table: MONITORED_TABLE,
            status: PENDING_STATUS,
            window_minutes,
        }
    }

    pub fn window_minutes(&self) -> u32 {
        self.window_minutes
    }

    /// Render the query for a dialect
    pub fn sql(&self, dialect: Dialect) -> String {
        match dialect {
            Dialect::Oracle => format!(
                "select count(*) from {} where status = {} and t_created > sysdate - ({}/(24*60))",
                self.table, self.status, self.window_minutes
            ),
            // t_created holds UTC text timestamps in SQLite
            Dialect::Sqlite => format!(
                "SELECT COUNT(*) FROM {} WHERE status = {} \
                 AND t_created > datetime('now', '-{} minutes')",
                self.table, self.status, self.window_minutes
            ),
        }
    }
}
