//! Tracing setup: console output plus `combined.log` (everything that passes
//! the filter) and `error.log` (errors only) in the configured directory.

use std::path::Path;

use tracing::{warn, Subscriber};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::{filter::LevelFilter, fmt, layer::SubscriberExt, EnvFilter, Layer};

pub const COMBINED_LOG: &str = "combined.log";
pub const ERROR_LOG: &str = "error.log";

/// Keeps the background file writers alive. Dropping it flushes them.
#[must_use = "file logging stops when the guard is dropped"]
pub struct FileLogs {
    _guards: Vec<WorkerGuard>,
    failures: Vec<String>,
}

/// Install the global subscriber.
pub fn init(filter: EnvFilter, log_dir: Option<&Path>) -> anyhow::Result<FileLogs> {
    let (subscriber, logs) = subscriber(filter, log_dir);
    tracing::subscriber::set_global_default(subscriber)?;
    for failure in &logs.failures {
        warn!("file logging disabled: {failure}");
    }
    Ok(logs)
}

pub fn subscriber(
    filter: EnvFilter,
    log_dir: Option<&Path>,
) -> (impl Subscriber + Send + Sync + 'static, FileLogs) {
    let mut guards = Vec::new();
    let mut failures = Vec::new();
    let mut open = |name: &str| -> Option<NonBlocking> {
        match appender(log_dir?, name) {
            Ok(file) => {
                let (writer, guard) = tracing_appender::non_blocking(file);
                guards.push(guard);
                Some(writer)
            }
            Err(e) => {
                failures.push(format!("{name}: {e}"));
                None
            }
        }
    };

    let combined = open(COMBINED_LOG).map(|w| fmt::layer().with_ansi(false).with_writer(w));
    let errors = open(ERROR_LOG).map(|w| {
        fmt::layer()
            .with_ansi(false)
            .with_writer(w)
            .with_filter(LevelFilter::ERROR)
    });

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(combined)
        .with(errors);

    (
        subscriber,
        FileLogs {
            _guards: guards,
            failures,
        },
    )
}

fn appender(dir: &Path, name: &str) -> Result<RollingFileAppender, InitError> {
    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(name)
        .build(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_are_split_into_their_own_file() {
        let dir = std::env::temp_dir().join(format!("ticker-logs-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);

        let (subscriber, logs) = subscriber(EnvFilter::new("info"), Some(&dir));
        assert!(logs.failures.is_empty());
        tracing::subscriber::with_default(subscriber, || {
            tracing::debug!("filtered out everywhere");
            tracing::info!("client connected");
            tracing::error!("failed to bind");
        });
        drop(logs);

        let combined = std::fs::read_to_string(dir.join(COMBINED_LOG)).unwrap();
        let errors = std::fs::read_to_string(dir.join(ERROR_LOG)).unwrap();
        let _ = std::fs::remove_dir_all(&dir);

        assert!(combined.contains("client connected"));
        assert!(combined.contains("failed to bind"));
        assert!(!combined.contains("filtered out everywhere"));
        assert!(errors.contains("failed to bind"));
        assert!(!errors.contains("client connected"));
    }

    #[test]
    fn no_directory_means_console_only() {
        let (_subscriber, logs) = subscriber(EnvFilter::new("info"), None);
        assert!(logs._guards.is_empty());
        assert!(logs.failures.is_empty());
    }
}
