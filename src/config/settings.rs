//! Tunable settings for the dispatch pipeline
//!
//! Each section maps to one component and deserializes with per-field
//! defaults, so a partial config file only overrides what it names.
//!
//! # Sections
//!
//! - [`QueueConfig`] - Bounded event queue capacity and overflow logging
//! - [`SchedulerConfig`] - Batch drain cadence and per-tick cap
//! - [`DisplayConfig`] - Display refresh timeout and placeholder text
//! - [`NavigationConfig`] - Debounce delay for panel rebuilds
//! - [`MonitorConfig`] - Grace period for the continuous monitor
//! - [`LoggingConfig`] - Log filter and optional log file

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default queue capacity
pub const DEFAULT_QUEUE_CAPACITY: usize = 2000;

/// Log a throttled overflow warning every this many drops
pub const DEFAULT_DROP_LOG_INTERVAL: u64 = 100;

/// Default drain interval in milliseconds (~30 Hz)
pub const DEFAULT_DRAIN_INTERVAL_MS: u64 = 33;

/// Default maximum number of events dispatched per tick
pub const DEFAULT_MAX_BATCH_SIZE: usize = 50;

/// Default display refresh timeout in milliseconds
pub const DEFAULT_REFRESH_TIMEOUT_MS: u64 = 2000;

/// Placeholder rendered for display variables that never answered
pub const DEFAULT_PLACEHOLDER: &str = "—";

/// Default navigation debounce in milliseconds
pub const DEFAULT_DEBOUNCE_MS: u64 = 150;

/// Default grace period after connect/aircraft switch in milliseconds
pub const DEFAULT_GRACE_PERIOD_MS: u64 = 3000;

/// Bounded event queue settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Hard capacity; enqueue is rejected once reached
    pub capacity: usize,
    /// Emit a warning every N dropped events
    pub drop_log_interval: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_QUEUE_CAPACITY,
            drop_log_interval: DEFAULT_DROP_LOG_INTERVAL,
        }
    }
}

/// Batch drain scheduler settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Tick interval in milliseconds
    pub interval_ms: u64,
    /// Maximum events dispatched per tick
    pub max_batch_size: usize,
}

impl SchedulerConfig {
    /// Tick interval as a Duration
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_DRAIN_INTERVAL_MS,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
        }
    }
}

/// Display aggregator settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// How long a panel refresh waits for requested variables
    pub refresh_timeout_ms: u64,
    /// Text rendered for variables that did not answer in time
    pub placeholder: String,
}

impl DisplayConfig {
    /// Refresh timeout as a Duration
    pub fn refresh_timeout(&self) -> Duration {
        Duration::from_millis(self.refresh_timeout_ms)
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            refresh_timeout_ms: DEFAULT_REFRESH_TIMEOUT_MS,
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
        }
    }
}

/// Panel navigation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    /// Quiet period before a panel rebuild runs
    pub debounce_ms: u64,
}

impl NavigationConfig {
    /// Debounce delay as a Duration
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
        }
    }
}

/// Continuous monitor settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Announcements are suppressed for this long after connect or aircraft switch
    pub grace_period_ms: u64,
}

impl MonitorConfig {
    /// Grace period as a Duration
    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            grace_period_ms: DEFAULT_GRACE_PERIOD_MS,
        }
    }
}

/// Logging settings read by the binary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub filter: String,
    /// Also write logs to a daily rolling file in the app data directory
    pub log_to_file: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info,simvox=debug".to_string(),
            log_to_file: false,
        }
    }
}
