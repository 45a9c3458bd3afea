//! Environment detection and defensive value parsing

use std::fmt::Display;
use std::str::FromStr;

/// Where the monitor is running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunEnvironment {
    /// Invoked by a GitHub Actions workflow (`GITHUB_ACTIONS` is set)
    GithubActions,
    /// Anything else, typically a developer machine
    Local,
}

impl RunEnvironment {
    /// Detect the environment from the process environment
    pub fn detect() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Detect the environment from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if lookup("GITHUB_ACTIONS").is_some() {
            RunEnvironment::GithubActions
        } else {
            RunEnvironment::Local
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RunEnvironment::GithubActions => "GitHub Actions",
            RunEnvironment::Local => "Local Development",
        }
    }

    pub fn is_ci(&self) -> bool {
        matches!(self, RunEnvironment::GithubActions)
    }
}

/// Load a `.env` file for local runs. CI provides its environment directly.
pub fn load_local_env(environment: RunEnvironment) {
    if environment.is_ci() {
        return;
    }

    match dotenv::dotenv() {
        Ok(path) => tracing::info!(
            path = %path.display(),
            "Loaded .env file for local development"
        ),
        Err(e) if e.not_found() => tracing::debug!("No .env file found"),
        Err(e) => tracing::warn!(error = %e, "Could not load .env file"),
    }
}

/// Parse an optional value, falling back to `default` with a warning when the
/// value is present but empty or unparseable.
pub(crate) fn parse_or_default<T>(key: &str, raw: Option<&str>, default: T) -> T
where
    T: FromStr + Display,
{
    let Some(raw) = raw.map(str::trim) else {
        return default;
    };

    if raw.is_empty() {
        tracing::warn!("{} is empty, using default value of {}", key, default);
        return default;
    }

    match raw.parse::<T>() {
        Ok(value) => value,
        Err(_) => {
            tracing::warn!("{} '{}' is not valid, using default value of {}", key, raw, default);
            default
        }
    }
}

/// Treat empty strings the same as unset keys
pub(crate) fn non_empty(raw: Option<String>) -> Option<String> {
    raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}
