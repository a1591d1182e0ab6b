//! File logging. The terminal belongs to the TUI, so nothing goes to stdout.

use crate::config::LoggingConfig;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub struct FileLogGuard {
    _guard: WorkerGuard,
}

/// Pick the first directive that parses: `RUST_LOG`, then the configured
/// level, then `info`.
fn filter_directive(env: Option<&str>, level: &str) -> String {
    [env, Some(level)]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|directive| !directive.is_empty() && EnvFilter::try_new(directive).is_ok())
        .unwrap_or("info")
        .to_string()
}

fn env_filter(level: &str) -> EnvFilter {
    let env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    EnvFilter::new(filter_directive(env.as_deref(), level))
}

/// Install a daily rolling file subscriber under `data_dir/logs`.
///
/// Returns `None` when the log directory cannot be created; the app then
/// runs without logging. Keep the guard alive until exit to flush.
pub fn init_tracing(data_dir: &Path, config: &LoggingConfig) -> Option<FileLogGuard> {
    let log_dir = data_dir.join("logs");
    if std::fs::create_dir_all(&log_dir).is_err() {
        return None;
    }

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, &config.file_name);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_target(true);

    let installed = tracing_subscriber::registry()
        .with(env_filter(&config.level))
        .with(file_layer)
        .try_init();

    installed.ok().map(|_| FileLogGuard { _guard: guard })
}
