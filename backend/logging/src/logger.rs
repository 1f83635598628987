//! Structured Logger
//!
//! Wraps `tracing` to provide console output, optional NDJSON file rotation,
//! and environment-based level control.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Log file prefix inside the log directory.
pub const LOG_FILE_NAME: &str = "statuskeeper.log";

/// Keeps the file writer flushing until dropped. Hold it for the life of the process.
pub struct LogGuard {
    _file: Option<WorkerGuard>,
}

/// Initialize the global structured logger.
///
/// Always logs to stdout. When `log_dir` is given, also writes NDJSON to
/// `<log_dir>/statuskeeper.log.YYYY-MM-DD`. `RUST_LOG` takes precedence over `level`.
pub fn init_logger<P: AsRef<Path>>(log_dir: Option<P>, level: &str) -> LogGuard {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let console_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(false)
        .with_ansi(true);

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = RollingFileAppender::new(Rotation::DAILY, dir, LOG_FILE_NAME);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().json().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init();

    LogGuard { _file: guard }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_harmless() {
        let _first = init_logger(None::<&Path>, "info");
        let _second = init_logger(None::<&Path>, "debug");
        tracing::info!("still logging");
    }
}
