//! Logging infrastructure.
//!
//! Provides structured logging with file output and console output:
//! - Appends to `<dir>/<file>` through a non-blocking writer
//! - Also prints to stdout
//! - Configurable via RUST_LOG environment variable
//!
//! The log file is best-effort. If the directory cannot be created or the file
//! cannot be opened, logging falls back to the console and the reason is kept
//! on the returned [`LoggingGuard`]. Nothing in the bridge depends on it.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingSettings;

/// Guard that must be kept alive for the duration of logging.
///
/// Dropping this guard will flush and close the log file writer.
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
    file_error: Option<String>,
    installed: bool,
}

impl LoggingGuard {
    /// Why the log file could not be used, if it could not.
    pub fn file_error(&self) -> Option<&str> {
        self.file_error.as_deref()
    }

    /// False when another global subscriber was already installed.
    pub fn is_installed(&self) -> bool {
        self.installed
    }
}

impl std::fmt::Debug for LoggingGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoggingGuard")
            .field("file", &self._file_guard.is_some())
            .field("file_error", &self.file_error)
            .field("installed", &self.installed)
            .finish()
    }
}

/// Initialize logging to `log_dir/log_file` and stdout.
///
/// Never fails: see [`LoggingGuard::file_error`].
pub fn init_logging(log_dir: &Path, log_file: &str) -> LoggingGuard {
    match open_log_file(log_dir, log_file) {
        Ok(file) => install(Some(file), None),
        Err(e) => install(
            None,
            Some(format!(
                "cannot open {}: {}",
                log_dir.join(log_file).display(),
                e
            )),
        ),
    }
}

/// Initialize logging from `[logging]` settings. Console only when disabled.
pub fn init_from_settings(settings: &LoggingSettings) -> LoggingGuard {
    if settings.enabled {
        init_logging(&settings.directory, &settings.file)
    } else {
        install(None, None)
    }
}

fn open_log_file(log_dir: &Path, log_file: &str) -> io::Result<File> {
    fs::create_dir_all(log_dir)?;
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join(log_file))
}

fn install(file: Option<File>, file_error: Option<String>) -> LoggingGuard {
    let (file_layer, file_guard) = match file {
        Some(file) => {
            let (writer, guard) = tracing_appender::non_blocking(file);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false) // No ANSI colors in file
                .with_span_events(FmtSpan::CLOSE);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stdout)
        .with_ansi(true)
        .with_span_events(FmtSpan::CLOSE);

    // Create env filter (defaults to INFO if RUST_LOG not set)
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let installed = tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .try_init()
        .is_ok();

    if let Some(reason) = &file_error {
        tracing::warn!(reason = %reason, "log file unavailable, logging to console only");
    }

    LoggingGuard {
        _file_guard: file_guard,
        file_error,
        installed,
    }
}
