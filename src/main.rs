//! mescheck
//!
//! Run with: cargo run
//!
//! Runs one check and exits with 0 when the check completed (alerting or
//! not) and 1 when it failed. See [`mescheck::config`] for the environment
//! variables it reads. Outside GitHub Actions a `.env` file is loaded first.
//!
//! - RUST_LOG: Log level (default: mescheck=info)

use std::process::ExitCode;

use mescheck::alerts::{AlertChecker, ChannelNotifier, CheckStatus};
use mescheck::config::{load_local_env, MonitorConfig, RunEnvironment};
use mescheck::report::GithubOutput;
use mescheck::runtime;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mescheck=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let environment = RunEnvironment::detect();
    tracing::info!("Environment: {}", environment.label());
    load_local_env(environment);

    let config = MonitorConfig::from_env();

    tracing::info!("mescheck configuration:");
    tracing::info!("  Backend: {}", config.backend);
    tracing::info!("  Metric: {}", config.metric_name());
    tracing::info!("  Threshold: {}", config.threshold.value);
    tracing::info!("  Query timeout: {:?}", config.db_timeout);
    tracing::info!("  Notify timeout: {:?}", config.notify_timeout);
    if let Some(url) = &config.webhook_url {
        tracing::info!("  Webhook: {}", url);
    }
    match &config.output_path {
        Some(path) => tracing::info!("  Output: {}", path.display()),
        None => tracing::info!("  Output: DISABLED (GITHUB_OUTPUT not set)"),
    }

    // Client library initialization happens here, once
    let source = mescheck::source::from_config(&config);
    let notifier = ChannelNotifier::from_config(&config);
    let sink = GithubOutput::new(config.output_path.clone());

    let check = AlertChecker::new(&config, source.as_ref(), &notifier, &sink);
    match runtime::run_once(check.run()) {
        Ok(outcome) => ExitCode::from(outcome.status.exit_code()),
        Err(e) => {
            tracing::error!(error = %e, "Failed to start async runtime");
            ExitCode::from(CheckStatus::Failed.exit_code())
        }
    }
}
