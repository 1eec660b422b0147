use std::fs;
use std::path::Path;

use tracing::Subscriber;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const LOG_FILE_NAME: &str = "grant-wrangler.log";

/// Initializes console logging on stderr, plus a JSON log file when `log_dir` is given.
///
/// The returned guard must be held until exit so buffered file logs are flushed.
pub fn init_logging(verbose: bool, log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let (subscriber, guard) = build_subscriber(verbose, log_dir);
    subscriber.init();
    guard
}

pub fn build_subscriber(
    verbose: bool,
    log_dir: Option<&Path>,
) -> (impl Subscriber + Send + Sync + 'static, Option<WorkerGuard>) {
    let default_level = if verbose {
        "grant_wrangler=debug"
    } else {
        "grant_wrangler=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // stdout is reserved for summaries and program tables
    let console_layer = fmt::layer().with_writer(std::io::stderr).with_target(false);

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let _ = fs::create_dir_all(dir);
            let file_appender = tracing_appender::rolling::never(dir, LOG_FILE_NAME);
            let (writer, guard) = tracing_appender::non_blocking(file_appender);
            (Some(fmt::layer().json().with_writer(writer)), Some(guard))
        }
        None => (None, None),
    };

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer);

    (subscriber, guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_file_log_is_flushed_when_guard_drops() {
        let dir = tempdir().unwrap();
        let (subscriber, guard) = build_subscriber(false, Some(dir.path()));

        tracing::subscriber::with_default(subscriber, || {
            tracing::error!("no usable input");
        });
        drop(guard);

        let log = fs::read_to_string(dir.path().join(LOG_FILE_NAME)).unwrap();
        assert!(log.contains("no usable input"));
        assert!(log.contains("\"level\":\"ERROR\""));
    }
}
