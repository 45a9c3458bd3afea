//! Monitor configuration
//!
//! All environment keys are resolved once into a [`MonitorConfig`] which is
//! then passed into the check pipeline. Optional keys fall back to their
//! defaults with a warning. The database credentials are mandatory and are
//! validated by [`DatabaseSettings::validate`] at the start of a check.
//!
//! Keys:
//! - ORACLE_USER, ORACLE_PASSWORD, ORACLE_DSN: data store identity, secret and address
//! - THRESHOLD_VALUE: alert threshold (default: 100)
//! - MESSAGE_STATUS: status label used in the metric name (default: 0)
//! - CHECK_WINDOW_MINUTES: trailing window of the count query (default: 10)
//! - DB_BACKEND: `oracle` or `sqlite`
//! - ORACLE_CLIENT_LIB_DIR: Oracle client library directory
//! - DB_TIMEOUT_SECS: bound on the metric query (default: 30)
//! - SMTP_SERVER, SMTP_PORT (default: 587), SMTP_USER, SMTP_PASSWORD
//! - FROM_EMAIL, TO_EMAILS: sender and comma-separated recipients
//! - NOTIFY_TIMEOUT_SECS: bound on each notification delivery (default: 30)
//! - ALERT_WEBHOOK_URL: optional webhook notified alongside email
//! - GITHUB_OUTPUT: outcome record destination (skipped when unset)

pub mod env;

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub use env::{load_local_env, RunEnvironment};
use env::{non_empty, parse_or_default};

pub const DEFAULT_THRESHOLD: u64 = 100;
pub const DEFAULT_SMTP_PORT: u16 = 587;
pub const DEFAULT_WINDOW_MINUTES: u32 = 10;
pub const DEFAULT_STATUS_LABEL: &str = "0";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Oracle client location on the GitHub Actions runners
pub const CI_CLIENT_LIB_DIR: &str = "/opt/oracle/instantclient_19_23";

/// Threshold at or above which the check alerts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThresholdConfig {
    pub value: u64,
}

impl ThresholdConfig {
    /// Parse `THRESHOLD_VALUE`. Never fails: anything that is not a
    /// non-negative integer yields [`DEFAULT_THRESHOLD`].
    pub fn parse(raw: Option<&str>) -> Self {
        Self {
            value: parse_or_default("THRESHOLD_VALUE", raw, DEFAULT_THRESHOLD),
        }
    }
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            value: DEFAULT_THRESHOLD,
        }
    }
}

/// Data store backend used by the metric source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbBackend {
    Oracle,
    Sqlite,
}

impl DbBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            DbBackend::Oracle => "oracle",
            DbBackend::Sqlite => "sqlite",
        }
    }
}

impl Default for DbBackend {
    fn default() -> Self {
        if cfg!(feature = "oracle-db") {
            DbBackend::Oracle
        } else {
            DbBackend::Sqlite
        }
    }
}

impl fmt::Display for DbBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DbBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "oracle" => Ok(DbBackend::Oracle),
            "sqlite" => Ok(DbBackend::Sqlite),
            other => Err(format!("unknown backend {}", other)),
        }
    }
}

/// Database credentials as read from the environment, not yet validated
#[derive(Clone, Default)]
pub struct DatabaseSettings {
    pub user: Option<String>,
    pub password: Option<String>,
    pub dsn: Option<String>,
}

impl DatabaseSettings {
    /// Require identity, secret and address
    pub fn validate(&self) -> Result<DatabaseConfig, ConfigError> {
        match (&self.user, &self.password, &self.dsn) {
            (Some(user), Some(password), Some(dsn)) => Ok(DatabaseConfig {
                user: user.clone(),
                password: password.clone(),
                dsn: dsn.clone(),
            }),
            _ => {
                let mut missing = Vec::new();
                if self.user.is_none() {
                    missing.push("ORACLE_USER");
                }
                if self.password.is_none() {
                    missing.push("ORACLE_PASSWORD");
                }
                if self.dsn.is_none() {
                    missing.push("ORACLE_DSN");
                }
                Err(ConfigError::Missing(missing))
            }
        }
    }
}

impl fmt::Debug for DatabaseSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseSettings")
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("dsn", &self.dsn)
            .finish()
    }
}

/// Validated connection parameters for the metric source
#[derive(Clone)]
pub struct DatabaseConfig {
    pub user: String,
    pub password: String,
    pub dsn: String,
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("dsn", &self.dsn)
            .finish()
    }
}

/// SMTP transport settings. Completeness is checked at delivery time so a
/// missing key fails the notification, not the check.
#[derive(Clone)]
pub struct SmtpSettings {
    pub server: Option<String>,
    pub port: u16,
    pub user: Option<String>,
    pub password: Option<String>,
    pub from: Option<String>,
    /// Comma-separated recipient list
    pub to: Option<String>,
}

impl SmtpSettings {
    /// Keys that are required for delivery but unset
    pub fn missing_keys(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.server.is_none() {
            missing.push("SMTP_SERVER");
        }
        if self.user.is_none() {
            missing.push("SMTP_USER");
        }
        if self.password.is_none() {
            missing.push("SMTP_PASSWORD");
        }
        if self.from.is_none() {
            missing.push("FROM_EMAIL");
        }
        if self.to.is_none() {
            missing.push("TO_EMAILS");
        }
        missing
    }
}

impl Default for SmtpSettings {
    fn default() -> Self {
        Self {
            server: None,
            port: DEFAULT_SMTP_PORT,
            user: None,
            password: None,
            from: None,
            to: None,
        }
    }
}

impl fmt::Debug for SmtpSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpSettings")
            .field("server", &self.server)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("from", &self.from)
            .field("to", &self.to)
            .finish()
    }
}

/// Complete configuration of one monitor run
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub environment: RunEnvironment,
    pub database: DatabaseSettings,
    pub backend: DbBackend,
    /// Oracle client library directory, if one should be passed explicitly
    pub client_lib_dir: Option<PathBuf>,
    pub db_timeout: Duration,
    pub threshold: ThresholdConfig,
    /// Free-form status label, only used in the metric name
    pub status_label: String,
    pub window_minutes: u32,
    pub smtp: SmtpSettings,
    pub webhook_url: Option<String>,
    pub notify_timeout: Duration,
    /// Destination of the outcome record
    pub output_path: Option<PathBuf>,
}

impl MonitorConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = RunEnvironment::from_lookup(&lookup);
        let get = |key: &str| non_empty(lookup(key));

        let database = DatabaseSettings {
            user: get("ORACLE_USER"),
            password: get("ORACLE_PASSWORD"),
            dsn: get("ORACLE_DSN"),
        };

        let backend = get("DB_BACKEND")
            .map(|raw| {
                raw.parse::<DbBackend>().unwrap_or_else(|e| {
                    let fallback = DbBackend::default();
                    tracing::warn!("DB_BACKEND: {}, using {}", e, fallback);
                    fallback
                })
            })
            .unwrap_or_default();

        let client_lib_dir = get("ORACLE_CLIENT_LIB_DIR")
            .map(PathBuf::from)
            .or_else(|| environment.is_ci().then(|| PathBuf::from(CI_CLIENT_LIB_DIR)));

        let threshold = ThresholdConfig::parse(lookup("THRESHOLD_VALUE").as_deref());

        let mut window_minutes = parse_or_default(
            "CHECK_WINDOW_MINUTES",
            lookup("CHECK_WINDOW_MINUTES").as_deref(),
            DEFAULT_WINDOW_MINUTES,
        );
        if window_minutes == 0 {
            tracing::warn!(
                "CHECK_WINDOW_MINUTES must be positive, using default value of {}",
                DEFAULT_WINDOW_MINUTES
            );
            window_minutes = DEFAULT_WINDOW_MINUTES;
        }

        let smtp = SmtpSettings {
            server: get("SMTP_SERVER"),
            port: parse_or_default("SMTP_PORT", lookup("SMTP_PORT").as_deref(), DEFAULT_SMTP_PORT),
            user: get("SMTP_USER"),
            password: get("SMTP_PASSWORD"),
            from: get("FROM_EMAIL"),
            to: get("TO_EMAILS"),
        };

        Self {
            environment,
            database,
            backend,
            client_lib_dir,
            db_timeout: timeout_secs("DB_TIMEOUT_SECS", lookup("DB_TIMEOUT_SECS").as_deref()),
            threshold,
            status_label: get("MESSAGE_STATUS").unwrap_or_else(|| DEFAULT_STATUS_LABEL.to_string()),
            window_minutes,
            smtp,
            webhook_url: get("ALERT_WEBHOOK_URL"),
            notify_timeout: timeout_secs(
                "NOTIFY_TIMEOUT_SECS",
                lookup("NOTIFY_TIMEOUT_SECS").as_deref(),
            ),
            output_path: get("GITHUB_OUTPUT").map(PathBuf::from),
        }
    }

    /// Name of the metric, derived from the same window the query uses
    pub fn metric_name(&self) -> String {
        format!(
            "L2_TO_MES_MESSAGES_STATUS_{}_LAST_{}_MIN",
            self.status_label, self.window_minutes
        )
    }
}

/// A zero timeout would fail every call, so it is treated as invalid
fn timeout_secs(key: &str, raw: Option<&str>) -> Duration {
    let secs = match parse_or_default(key, raw, DEFAULT_TIMEOUT_SECS) {
        0 => {
            tracing::warn!(
                "{} must be positive, using default value of {}",
                key,
                DEFAULT_TIMEOUT_SECS
            );
            DEFAULT_TIMEOUT_SECS
        }
        secs => secs,
    };
    Duration::from_secs(secs)
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variables: {}", .0.join(", "))]
    Missing(Vec<&'static str>),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> MonitorConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        MonitorConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_threshold_parsing() {
        assert_eq!(ThresholdConfig::parse(None).value, 100);
        assert_eq!(ThresholdConfig::parse(Some("abc")).value, 100);
        assert_eq!(ThresholdConfig::parse(Some("50")).value, 50);
        assert_eq!(ThresholdConfig::parse(Some(" 0 ")).value, 0);
        assert_eq!(ThresholdConfig::parse(Some("")).value, 100);
        assert_eq!(ThresholdConfig::parse(Some("-1")).value, 100);
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);
        assert_eq!(config.threshold.value, DEFAULT_THRESHOLD);
        assert_eq!(config.smtp.port, DEFAULT_SMTP_PORT);
        assert_eq!(config.window_minutes, DEFAULT_WINDOW_MINUTES);
        assert_eq!(config.status_label, "0");
        assert_eq!(config.db_timeout, Duration::from_secs(30));
        assert_eq!(config.environment, RunEnvironment::Local);
        assert!(config.client_lib_dir.is_none());
        assert!(config.output_path.is_none());
        assert!(config.webhook_url.is_none());
    }

    #[test]
    fn test_metric_name_follows_window() {
        let config = config_from(&[("MESSAGE_STATUS", "ERROR"), ("CHECK_WINDOW_MINUTES", "15")]);
        assert_eq!(config.metric_name(), "L2_TO_MES_MESSAGES_STATUS_ERROR_LAST_15_MIN");

        let config = config_from(&[("CHECK_WINDOW_MINUTES", "0")]);
        assert_eq!(config.metric_name(), "L2_TO_MES_MESSAGES_STATUS_0_LAST_10_MIN");
    }

    #[test]
    fn test_database_validation() {
        let config = config_from(&[
            ("ORACLE_USER", "monitor"),
            ("ORACLE_PASSWORD", "secret"),
            ("ORACLE_DSN", "db:1521/MES"),
        ]);
        let db = config.database.validate().unwrap();
        assert_eq!(db.user, "monitor");
        assert_eq!(db.dsn, "db:1521/MES");
        assert!(!format!("{:?}", db).contains("secret"));

        let config = config_from(&[("ORACLE_USER", "monitor"), ("ORACLE_PASSWORD", "  ")]);
        match config.database.validate() {
            Err(ConfigError::Missing(keys)) => {
                assert_eq!(keys, vec!["ORACLE_PASSWORD", "ORACLE_DSN"]);
            }
            other => panic!("expected missing keys, got {:?}", other),
        }
    }

    #[test]
    fn test_timeouts() {
        let config = config_from(&[("DB_TIMEOUT_SECS", "5"), ("NOTIFY_TIMEOUT_SECS", "12")]);
        assert_eq!(config.db_timeout, Duration::from_secs(5));
        assert_eq!(config.notify_timeout, Duration::from_secs(12));

        let config = config_from(&[("DB_TIMEOUT_SECS", "0"), ("NOTIFY_TIMEOUT_SECS", "0")]);
        assert_eq!(config.db_timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert_eq!(config.notify_timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    }

    #[test]
    fn test_ci_client_lib_dir() {
        let config = config_from(&[("GITHUB_ACTIONS", "true")]);
        assert_eq!(config.client_lib_dir, Some(PathBuf::from(CI_CLIENT_LIB_DIR)));

        let config = config_from(&[
            ("GITHUB_ACTIONS", "true"),
            ("ORACLE_CLIENT_LIB_DIR", "/opt/ic"),
        ]);
        assert_eq!(config.client_lib_dir, Some(PathBuf::from("/opt/ic")));
    }

    #[test]
    fn test_backend_and_smtp() {
        let config = config_from(&[
            ("DB_BACKEND", "SQLite"),
            ("SMTP_PORT", "not-a-port"),
            ("SMTP_SERVER", "smtp.example.com"),
        ]);
        assert_eq!(config.backend, DbBackend::Sqlite);
        assert_eq!(config.smtp.port, 587);
        assert_eq!(
            config.smtp.missing_keys(),
            vec!["SMTP_USER", "SMTP_PASSWORD", "FROM_EMAIL", "TO_EMAILS"]
        );

        let config = config_from(&[("DB_BACKEND", "postgres")]);
        assert_eq!(config.backend, DbBackend::default());
    }
}
