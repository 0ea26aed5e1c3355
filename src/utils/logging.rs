//! Tracing subscriber setup shared by the server and the CLI tools

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{LogFormat, LogTarget, LoggingConfig};

/// Install the global subscriber
///
/// `RUST_LOG` wins over `level_override`, which wins over the configured level.
/// The returned guard must live until exit so buffered file output is flushed.
pub fn init_logging(config: &LoggingConfig, level_override: Option<&str>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_override.unwrap_or(&config.level)));

    let to_console = matches!(config.target, LogTarget::Console | LogTarget::Both);
    let (file_writer, guard) = match config.target {
        LogTarget::Console => (None, None),
        LogTarget::File | LogTarget::Both => {
            let (writer, guard) = create_file_writer(config);
            (Some(writer), Some(guard))
        }
    };

    let registry = tracing_subscriber::registry().with(filter);
    match config.format {
        LogFormat::Json => registry
            .with(to_console.then(|| fmt::layer().json().with_target(true)))
            .with(file_writer.map(|w| fmt::layer().json().with_target(true).with_writer(w)))
            .init(),
        LogFormat::Compact => registry
            .with(to_console.then(|| fmt::layer().compact().with_target(false)))
            .with(file_writer.map(|w| fmt::layer().compact().with_target(false).with_writer(w)))
            .init(),
        LogFormat::Pretty => registry
            .with(to_console.then(|| fmt::layer().with_target(true).with_thread_ids(false)))
            .with(file_writer.map(|w| {
                fmt::layer()
                    .with_target(true)
                    .with_ansi(false)
                    .with_writer(w)
            }))
            .init(),
    }

    guard
}

/// Non-blocking file writer, rotated daily when configured
fn create_file_writer(config: &LoggingConfig) -> (NonBlocking, WorkerGuard) {
    if let Err(e) = std::fs::create_dir_all(&config.log_dir) {
        eprintln!(
            "Warning: Failed to create log directory {:?}: {}",
            config.log_dir, e
        );
    }

    let appender = if config.daily_rotation {
        tracing_appender::rolling::daily(&config.log_dir, &config.log_prefix)
    } else {
        tracing_appender::rolling::never(&config.log_dir, &config.log_prefix)
    };

    tracing_appender::non_blocking(appender)
}
