use std::path::Path;

use tracing::level_filters::LevelFilter;
use tracing::*;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, fmt::time::ChronoLocal, prelude::*, EnvFilter};

use crate::settings::Settings;

pub const LOG_FILE_NAME: &str = "audio-switcher.log";

/// Keeps the file writer flushing. Hold it until the process exits.
#[must_use = "dropping the guard stops file logging"]
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

/// `RUST_LOG` wins if it's set, otherwise the level from the config file.
fn env_filter(fallback: LevelFilter) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback.to_string()))
}

/// Sends logs to stderr, and to a daily log file in `log_dir` unless disabled.
pub fn initialize_logging(settings: &Settings, log_dir: &Path) -> LoggingGuard {
    let (file_layer, file_guard) = if settings.misc.log_to_file {
        let appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_NAME);
        let (non_blocking_file, guard) = tracing_appender::non_blocking(appender);
        let layer = fmt::layer()
            .with_writer(non_blocking_file)
            .with_ansi(false)
            .with_timer(ChronoLocal::rfc_3339())
            .with_thread_names(true)
            .with_target(true);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .compact();

    tracing_subscriber::registry()
        .with(env_filter(settings.get_log_level()))
        .with(file_layer)
        .with(stderr_layer)
        .init();

    info!(
        "{} v{} logging to {}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        if settings.misc.log_to_file {
            log_dir.join(LOG_FILE_NAME).display().to_string()
        } else {
            String::from("stderr only")
        }
    );

    LoggingGuard {
        _file_guard: file_guard,
    }
}
