//! Configuration module for simvox
//!
//! All pipeline tunables live in a single [`AppConfig`] persisted as TOML.
//!
//! # App Data Location
//!
//! The config file and optional log files are stored in the platform-appropriate
//! data directory under `dev.simvox`:
//!
//! - **Linux**: `~/.local/share/dev.simvox/`
//! - **macOS**: `~/Library/Application Support/dev.simvox/`
//! - **Windows**: `%APPDATA%\dev.simvox\`
//!
//! # Example
//!
//! ```ignore
//! use simvox::config::AppConfig;
//!
//! let mut config = AppConfig::load_or_default();
//! config.scheduler.max_batch_size = 100;
//! config.save()?;
//! ```

pub mod settings;

pub use settings::*;

use crate::error::{Result, SimVoxError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application identifier for data directories
pub const APP_ID: &str = "dev.simvox";

/// Config filename
pub const CONFIG_FILE: &str = "config.toml";

/// Log directory name inside the app data directory
pub const LOG_DIR: &str = "logs";

// ==================== App Data Directory ====================

/// Get the application data directory path
pub fn app_data_dir() -> Option<PathBuf> {
    dirs_next::data_dir().map(|p| p.join(APP_ID))
}

/// Ensure the app data directory exists
pub fn ensure_app_data_dir() -> Result<PathBuf> {
    let dir = app_data_dir().ok_or_else(|| {
        SimVoxError::Config("Could not determine app data directory".to_string())
    })?;

    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| {
            SimVoxError::Config(format!("Failed to create app data directory: {}", e))
        })?;
    }

    Ok(dir)
}

/// Get the path to the config file
pub fn config_path() -> Option<PathBuf> {
    app_data_dir().map(|p| p.join(CONFIG_FILE))
}

// ==================== App Config ====================

/// Complete pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Bounded event queue
    #[serde(default)]
    pub queue: QueueConfig,

    /// Batch drain scheduler
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Display aggregator
    #[serde(default)]
    pub display: DisplayConfig,

    /// Panel navigation debounce
    #[serde(default)]
    pub navigation: NavigationConfig,

    /// Continuous monitor
    #[serde(default)]
    pub monitor: MonitorConfig,

    /// Logging
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Load config from the default location, or defaults if the file doesn't exist
    pub fn load() -> Result<Self> {
        let path = config_path().ok_or_else(|| {
            SimVoxError::Config("Could not determine config path".to_string())
        })?;

        if !path.exists() {
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    /// Load config, returning defaults on any error
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Load and validate a config file from an explicit path
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            SimVoxError::Config(format!("Failed to read config {:?}: {}", path, e))
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| {
            SimVoxError::Config(format!("Failed to parse config {:?}: {}", path, e))
        })?;

        Ok(config.validated())
    }

    /// Save config to the default location
    pub fn save(&self) -> Result<()> {
        let dir = ensure_app_data_dir()?;
        self.save_to(dir.join(CONFIG_FILE))
    }

    /// Save config to an explicit path
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                SimVoxError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| SimVoxError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content).map_err(|e| {
            SimVoxError::Config(format!("Failed to write config {:?}: {}", path, e))
        })
    }

    /// Replace values that would stall the pipeline with defaults
    pub fn validated(mut self) -> Self {
        if self.queue.capacity == 0 {
            tracing::warn!("queue.capacity must be positive, using {}", DEFAULT_QUEUE_CAPACITY);
            self.queue.capacity = DEFAULT_QUEUE_CAPACITY;
        }
        if self.queue.drop_log_interval == 0 {
            self.queue.drop_log_interval = DEFAULT_DROP_LOG_INTERVAL;
        }
        if self.scheduler.interval_ms == 0 {
            tracing::warn!(
                "scheduler.interval_ms must be positive, using {}",
                DEFAULT_DRAIN_INTERVAL_MS
            );
            self.scheduler.interval_ms = DEFAULT_DRAIN_INTERVAL_MS;
        }
        if self.scheduler.max_batch_size == 0 {
            tracing::warn!(
                "scheduler.max_batch_size must be positive, using {}",
                DEFAULT_MAX_BATCH_SIZE
            );
            self.scheduler.max_batch_size = DEFAULT_MAX_BATCH_SIZE;
        }
        self
    }
}

// ==================== Tests ====================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_config_default() {
        let config = AppConfig::default();
        assert_eq!(config.queue.capacity, DEFAULT_QUEUE_CAPACITY);
        assert_eq!(config.scheduler.max_batch_size, DEFAULT_MAX_BATCH_SIZE);
        assert_eq!(config.display.placeholder, "—");
    }

    #[test]
    fn test_config_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE);

        let mut config = AppConfig::default();
        config.queue.capacity = 500;
        config.navigation.debounce_ms = 250;
        config.save_to(&path).unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[scheduler]\nmax_batch_size = 10\n").unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded.scheduler.max_batch_size, 10);
        assert_eq!(loaded.scheduler.interval_ms, DEFAULT_DRAIN_INTERVAL_MS);
        assert_eq!(loaded.queue, QueueConfig::default());
    }

    #[test]
    fn test_invalid_values_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[queue]\ncapacity = 0\n[scheduler]\ninterval_ms = 0\n").unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded.queue.capacity, DEFAULT_QUEUE_CAPACITY);
        assert_eq!(loaded.scheduler.interval_ms, DEFAULT_DRAIN_INTERVAL_MS);
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[queue\ncapacity = ").unwrap();

        let err = AppConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, SimVoxError::Config(_)));
    }
}
