//! Tracing subscriber setup.
//!
//! Logs always go to stderr. With a log path, they are also written to a file
//! through a non-blocking writer.

use std::path::Path;

use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt};

const LOG_FILE_PREFIX: &str = "points-ledger";
const LOG_FILE_SUFFIX: &str = "log";

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("cannot open log file: {0}")]
    Appender(#[from] InitError),

    #[error("logging already initialized: {0}")]
    Subscriber(#[from] TryInitError),
}

/// Install the global subscriber.
///
/// The returned guard flushes the log file on drop and must be kept alive for
/// the whole program.
pub fn init(log_path: Option<&Path>) -> Result<Option<WorkerGuard>, LoggingError> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_layer, guard) = match log_path {
        Some(path) => {
            let (writer, guard) = tracing_appender::non_blocking(file_appender(path)?);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init()?;

    Ok(guard)
}

/// A directory gets a daily rotated `points-ledger.<date>.log`; anything else is
/// treated as the log file itself.
pub fn file_appender(path: &Path) -> Result<RollingFileAppender, InitError> {
    let trailing_separator = path
        .as_os_str()
        .to_string_lossy()
        .ends_with(std::path::MAIN_SEPARATOR);
    if path.is_dir() || trailing_separator {
        return RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix(LOG_FILE_PREFIX)
            .filename_suffix(LOG_FILE_SUFFIX)
            .build(path);
    }

    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| format!("{LOG_FILE_PREFIX}.{LOG_FILE_SUFFIX}"));

    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name)
        .build(directory)
}
