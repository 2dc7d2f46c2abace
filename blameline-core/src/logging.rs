//! Logging for blameline
//!
//! Annotation failures are never shown to the user; they end up in
//! `$XDG_STATE_HOME/blameline/blameline.log` instead.

use crate::config::{Config, LoggingConfig};
use std::ffi::OsStr;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Crates whose events the configured level applies to.
const CRATES: [&str; 2] = ["blameline", "blameline_core"];

/// Filter directives for `level`, scoped to blameline's own crates.
///
/// Dependencies stay at `warn` so tokio and friends do not flood the log
/// at `debug`.
fn directives(level: &str) -> String {
    let mut directives = vec!["warn".to_string()];
    directives.extend(CRATES.iter().map(|krate| format!("{krate}={level}")));
    directives.join(",")
}

/// Install the global subscriber writing to the daily-rotated log file.
///
/// `RUST_LOG` overrides the configured level when set. Keep the returned
/// guard alive for the life of the process so buffered lines are flushed.
pub fn init(config: &LoggingConfig) -> crate::error::Result<LoggingGuard> {
    let log_path = Config::log_path();
    let log_dir = Config::state_dir();
    std::fs::create_dir_all(&log_dir)?;

    let file_name = log_path
        .file_name()
        .unwrap_or_else(|| OsStr::new("blameline.log"));
    let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(directives(&config.level)));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .with_line_number(true),
        )
        .init();

    tracing::info!(log = %log_path.display(), level = %config.level, "Logging initialized");
    Ok(LoggingGuard { _guard: guard })
}

/// Route events to the test harness's captured output.
///
/// Safe to call from every test; only the first call installs a subscriber.
pub fn init_test() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(directives("debug")));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// Flushes pending log lines when dropped.
pub struct LoggingGuard {
    _guard: tracing_appender::non_blocking::WorkerGuard,
}
