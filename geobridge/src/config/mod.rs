//! Configuration.
//!
//! [`ConfigFile`] mirrors `~/.geobridge/config.ini`; [`BridgeConfig`] is what a
//! [`Bridge`](crate::Bridge) is built from. A missing file yields defaults.
//!
//! ```ini
//! [pool]
//! workers = 8
//! scheduler_threads = 1
//!
//! [logging]
//! enabled = true
//! directory = ~/.geobridge/logs
//! file = geobridge.log
//!
//! [engine]
//! GDAL_CACHEMAX = 256
//! ```

mod defaults;
mod file;
mod parser;
mod settings;

pub use defaults::{
    clamp_scheduler_threads, clamp_workers, default_log_directory, default_workers, num_cpus,
    DEFAULT_LOG_FILE, DEFAULT_SCHEDULER_THREADS, DEFAULT_WORKERS_CAP, MAX_SCHEDULER_THREADS,
    MAX_WORKERS, MIN_SCHEDULER_THREADS, MIN_WORKERS,
};
pub use file::{config_directory, config_file_path, ConfigFileError};
pub use settings::{ConfigFile, EngineSettings, LoggingSettings, PoolSettings};

/// Runtime configuration of one bridge.
#[derive(Debug, Clone, PartialEq)]
pub struct BridgeConfig {
    /// Bounded size of the worker pool
    pub workers: usize,
    /// Threads that wait on lock domains for async calls
    pub scheduler_threads: usize,
    /// Native configuration options applied when the bridge starts
    pub engine_options: Vec<(String, String)>,
    /// Log output settings, consumed by [`crate::logging::init_from_settings`]
    pub log: LoggingSettings,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self::from(&ConfigFile::default())
    }
}

impl From<&ConfigFile> for BridgeConfig {
    fn from(file: &ConfigFile) -> Self {
        Self {
            workers: file.pool.workers,
            scheduler_threads: file.pool.scheduler_threads,
            engine_options: file.engine.options.clone(),
            log: file.logging.clone(),
        }
    }
}

impl BridgeConfig {
    /// Sets the worker pool size, clamped to `[MIN_WORKERS, MAX_WORKERS]`.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = clamp_workers(workers);
        self
    }

    pub fn with_scheduler_threads(mut self, threads: usize) -> Self {
        self.scheduler_threads = clamp_scheduler_threads(threads);
        self
    }

    pub fn with_engine_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.engine_options.push((key.into(), value.into()));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bridge_config_from_file() {
        let file = ConfigFile::parse("[pool]\nworkers = 5\n[engine]\nA = 1\n").unwrap();
        let config = BridgeConfig::from(&file);
        assert_eq!(config.workers, 5);
        assert_eq!(config.engine_options, vec![("A".to_string(), "1".to_string())]);
    }

    #[test]
    fn test_builder_clamps() {
        let config = BridgeConfig::default()
            .with_workers(0)
            .with_scheduler_threads(500)
            .with_engine_option("CPL_DEBUG", "ON");
        assert_eq!(config.workers, MIN_WORKERS);
        assert_eq!(config.scheduler_threads, MAX_SCHEDULER_THREADS);
        assert_eq!(config.engine_options.len(), 1);
    }
}
