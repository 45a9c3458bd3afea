//! `key=value` output file, as read by GitHub Actions step outputs

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::{OutcomeRecord, ResultSink};

/// Appends outcome fields to the file named by `GITHUB_OUTPUT`
#[derive(Debug, Clone, Default)]
pub struct GithubOutput {
    path: Option<PathBuf>,
}

impl GithubOutput {
    /// A sink without a destination silently skips every record
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

/// All fields of `outcome` as `name=value` lines
pub fn render(outcome: &OutcomeRecord) -> String {
    outcome
        .fields()
        .iter()
        .map(|(name, value)| format!("{}={}\n", name, value))
        .collect()
}

impl ResultSink for GithubOutput {
    /// The record goes out through one handle in one write
    fn record(&self, outcome: &OutcomeRecord) -> Result<(), SinkError> {
        let Some(path) = &self.path else {
            tracing::debug!("GITHUB_OUTPUT not set, skipping outcome record");
            return Ok(());
        };

        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        file.write_all(render(outcome).as_bytes())?;
        file.flush()?;
        Ok(())
    }
}

/// Result sink errors
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("Output write failed: {0}")]
    Io(#[from] std::io::Error),
}
