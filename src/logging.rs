//! `tracing` subscriber setup for the CLI.
//!
//! Diagnostics go to stderr, or to a daily log file, and never to stdout:
//! stdout carries the table or JSON output.

use crate::config::Config;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Prefix of the rolling log files in `log_dir`.
pub const LOG_FILE_PREFIX: &str = "cvrf-review.log";

/// Directives used when `RUST_LOG` is unset or invalid.
const DEFAULT_DIRECTIVES: &str = "info";

/// Install the global subscriber.
///
/// The returned guard flushes the file writer when dropped; keep it alive in
/// `main`. It is `None` when logging to stderr.
pub fn init_logging(config: &Config) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));

    if !config.log_to_file {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
            .init();
        return None;
    }

    let (writer, guard) = tracing_appender::non_blocking(rolling::daily(&config.log_dir, LOG_FILE_PREFIX));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .init();
    Some(guard)
}
