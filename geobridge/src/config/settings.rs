//! Settings structs for each configuration section.
//!
//! Each struct represents one `[section]` of the INI config file.

use std::path::PathBuf;

/// Complete configuration loaded from config.ini.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigFile {
    /// Worker pool sizing
    pub pool: PoolSettings,
    /// Diagnostic log output
    pub logging: LoggingSettings,
    /// Native configuration options applied at startup
    pub engine: EngineSettings,
}

/// `[pool]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolSettings {
    /// Threads that may run native calls at once
    pub workers: usize,
    /// Threads that wait on lock domains for async calls
    pub scheduler_threads: usize,
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    /// Whether to write a log file at all
    pub enabled: bool,
    /// Log directory
    pub directory: PathBuf,
    /// Log file name
    pub file: String,
}

/// `[engine]` section: every key is passed to the engine as a config option.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineSettings {
    /// Options in file order
    pub options: Vec<(String, String)>,
}
