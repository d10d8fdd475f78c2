//! Logging setup.

use std::path::{Path, PathBuf};
use tracing::Subscriber;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{fmt, prelude::*, registry::LookupSpan, EnvFilter, Layer};

/// Setup logging with the given level.
///
/// `RUST_LOG` overrides `level` when set. When `file` is given, events are
/// also written to a daily-rolling file next to it; keep the returned guard
/// alive for as long as logs should be flushed.
pub fn setup_logging(level: &str, json: bool, file: Option<&Path>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let (writer, guard) = match file {
        Some(path) => {
            let (dir, prefix) = log_file_parts(path);
            let appender = tracing_appender::rolling::daily(dir, prefix);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(writer), Some(guard))
        }
        None => (None, None),
    };

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .with(file_layer(writer))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().pretty())
            .with(file_layer(writer))
            .init();
    }

    guard
}

fn file_layer<S>(writer: Option<NonBlocking>) -> Option<impl Layer<S>>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    writer.map(|writer| fmt::layer().with_writer(writer).with_ansi(false))
}

/// Split a log path into its directory and file-name prefix.
fn log_file_parts(path: &Path) -> (PathBuf, String) {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    let prefix = path
        .file_name()
        .map_or_else(|| "indicators.log".to_string(), |n| n.to_string_lossy().into_owned());
    (dir, prefix)
}
