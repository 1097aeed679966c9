//! Logging.
//!
//! - `init_tracing`: global `tracing` subscriber, stderr plus an optional
//!   daily log file
//! - `JobLogger`: per-job `align.log` in the results folder, with the run's
//!   stages and a tail of FFmpeg stderr for failed applies
//!
//! ```no_run
//! use std::path::Path;
//! use anchor_core::logging::{JobLogger, LogConfig, Stage};
//!
//! let logger = JobLogger::create(Path::new("data/results/job-1"), LogConfig::default()).unwrap();
//! logger.stage(Stage::Anchor);
//! logger.command("ffmpeg -y -i ...");
//! logger.success("Alignment applied");
//! ```

mod job_logger;
mod types;

use std::path::Path;

pub use job_logger::{JobLogger, Stage, JOB_LOG_NAME};
pub use types::{LogConfig, LogLevel};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// File name prefix for the daily rolling log.
const LOG_FILE_PREFIX: &str = "first-anchor.log";

/// Initialize the global tracing subscriber.
///
/// - Respects the RUST_LOG environment variable
/// - Falls back to `default_level`
/// - Writes to stderr, and to a daily rolling file when `log_dir` is given
///
/// The returned guard flushes the file writer on drop; keep it alive for the
/// lifetime of the program. Should be called once at startup.
pub fn init_tracing(default_level: LogLevel, log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.as_filter_str()));

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_writer(std::io::stderr);

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let file_layer = fmt::layer().with_ansi(false).with_writer(writer);

            tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .with(file_layer)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .init();
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_strings_match_levels() {
        assert_eq!(LogLevel::Debug.as_filter_str(), "debug");
        assert_eq!(LogLevel::Info.as_filter_str(), "info");
    }
}
