//! Default values and limits for configuration settings.

use std::path::PathBuf;

use super::file::config_directory;
use super::settings::*;

// =============================================================================
// CPU helpers
// =============================================================================

/// Get the number of available CPU cores.
pub fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

/// Default worker pool size: max(2, num_cpus), capped at [`DEFAULT_WORKERS_CAP`].
pub fn default_workers() -> usize {
    num_cpus().max(2).min(DEFAULT_WORKERS_CAP)
}

// =============================================================================
// Worker pool
// =============================================================================

/// Upper bound on the CPU-derived default pool size.
pub const DEFAULT_WORKERS_CAP: usize = 16;

/// Minimum worker pool size.
pub const MIN_WORKERS: usize = 1;

/// Maximum worker pool size.
pub const MAX_WORKERS: usize = 64;

/// Default number of scheduler threads (async waiters, not native callers).
pub const DEFAULT_SCHEDULER_THREADS: usize = crate::dispatch::DEFAULT_SCHEDULER_THREADS;

pub const MIN_SCHEDULER_THREADS: usize = 1;

pub const MAX_SCHEDULER_THREADS: usize = 8;

/// Clamps the worker pool size to valid range and logs a warning if clamped.
pub fn clamp_workers(value: usize) -> usize {
    clamp_logged("workers", value, MIN_WORKERS, MAX_WORKERS)
}

/// Clamps the scheduler thread count to valid range and logs a warning if clamped.
pub fn clamp_scheduler_threads(value: usize) -> usize {
    clamp_logged(
        "scheduler_threads",
        value,
        MIN_SCHEDULER_THREADS,
        MAX_SCHEDULER_THREADS,
    )
}

fn clamp_logged(key: &'static str, value: usize, min: usize, max: usize) -> usize {
    if value < min {
        tracing::warn!(
            key,
            requested = value,
            min,
            max,
            "{} below minimum, clamping to {}",
            key,
            min
        );
        min
    } else if value > max {
        tracing::warn!(
            key,
            requested = value,
            min,
            max,
            "{} above maximum, clamping to {}",
            key,
            max
        );
        max
    } else {
        value
    }
}

// =============================================================================
// Logging
// =============================================================================

/// Default log file name.
pub const DEFAULT_LOG_FILE: &str = "geobridge.log";

/// Default log directory (~/.geobridge/logs).
pub fn default_log_directory() -> PathBuf {
    config_directory().join("logs")
}

// =============================================================================
// ConfigFile defaults
// =============================================================================

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            scheduler_threads: DEFAULT_SCHEDULER_THREADS,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: default_log_directory(),
            file: DEFAULT_LOG_FILE.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_workers_in_range() {
        let workers = default_workers();
        assert!(workers >= 2);
        assert!(workers <= DEFAULT_WORKERS_CAP);
    }

    #[test]
    fn test_clamp_workers() {
        assert_eq!(clamp_workers(0), MIN_WORKERS);
        assert_eq!(clamp_workers(8), 8);
        assert_eq!(clamp_workers(1000), MAX_WORKERS);
    }

    #[test]
    fn test_clamp_scheduler_threads() {
        assert_eq!(clamp_scheduler_threads(0), MIN_SCHEDULER_THREADS);
        assert_eq!(clamp_scheduler_threads(2), 2);
        assert_eq!(clamp_scheduler_threads(99), MAX_SCHEDULER_THREADS);
    }

    #[test]
    fn test_default_log_settings() {
        let logging = LoggingSettings::default();
        assert!(logging.enabled);
        assert_eq!(logging.file, DEFAULT_LOG_FILE);
        assert!(logging.directory.ends_with("logs"));
    }
}
