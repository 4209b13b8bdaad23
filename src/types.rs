//! Core data types for simvox
//!
//! This module contains the fundamental data structures shared by the
//! dispatch pipeline and its collaborators.
//!
//! # Main Types
//!
//! - [`VariableUpdateEvent`] - A single named value change reported by the simulator
//! - [`VariableDefinition`] - Read-only metadata about a variable (name, units, value descriptions)
//! - [`UpdateFrequency`] / [`VariableKind`] - Classification used by the dispatcher
//! - [`QueueStats`] / [`TickReport`] / [`HealthSnapshot`] - Diagnostics for health checks

use serde::{Deserialize, Serialize};

/// A single variable update delivered by the simulator interconnect.
///
/// Immutable once created. Each event is either consumed exactly once by the
/// dispatcher or dropped by the queue before consumption.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableUpdateEvent {
    /// Variable key (e.g. `A32NX_FMGC_FLIGHT_PHASE`)
    pub name: String,
    /// New value
    pub value: f64,
    /// Free-form description supplied by the source (may be empty)
    #[serde(default)]
    pub description: String,
    /// True when the value is the response to an explicit request rather than a change
    #[serde(default)]
    pub is_initial_value: bool,
}

impl VariableUpdateEvent {
    /// Create a regular (change) update
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
            description: String::new(),
            is_initial_value: false,
        }
    }

    /// Create an update that answers an explicit value request
    pub fn initial(name: impl Into<String>, value: f64) -> Self {
        Self {
            is_initial_value: true,
            ..Self::new(name, value)
        }
    }

    /// Attach a source-supplied description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// How often the simulator reports a variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum UpdateFrequency {
    /// Only sent in response to an explicit request
    #[default]
    OnDemand,
    /// Sent whenever the value changes
    Continuous,
}

/// Kind of simulator variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum VariableKind {
    /// Local (aircraft) variable
    #[default]
    LVar,
    /// Simulator event
    Event,
    /// HTML gauge variable
    HVar,
}

/// Read-only metadata about a simulator variable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDefinition {
    /// Variable key
    pub key: String,
    /// Human-readable name used in announcements
    pub display_name: String,
    /// Unit suffix used in displays (may be empty)
    #[serde(default)]
    pub units: String,
    /// Value → spoken description. Keys are unique.
    #[serde(default)]
    pub value_descriptions: Vec<(f64, String)>,
    /// Update frequency class
    #[serde(default)]
    pub update_frequency: UpdateFrequency,
    /// Whether changes may be announced by the continuous monitor
    #[serde(default)]
    pub is_announced: bool,
    /// Variable kind
    #[serde(default)]
    pub kind: VariableKind,
}

impl VariableDefinition {
    /// Create a new on-demand definition
    pub fn new(key: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            display_name: display_name.into(),
            units: String::new(),
            value_descriptions: Vec::new(),
            update_frequency: UpdateFrequency::OnDemand,
            is_announced: false,
            kind: VariableKind::LVar,
        }
    }

    /// Set the unit suffix
    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.units = units.into();
        self
    }

    /// Add a value description, replacing any existing description for the same value
    pub fn with_value(mut self, value: f64, description: impl Into<String>) -> Self {
        let description = description.into();
        match self.value_descriptions.iter_mut().find(|(v, _)| *v == value) {
            Some(entry) => entry.1 = description,
            None => self.value_descriptions.push((value, description)),
        }
        self
    }

    /// Mark as a continuously reported, announced variable
    pub fn continuous_announced(mut self) -> Self {
        self.update_frequency = UpdateFrequency::Continuous;
        self.is_announced = true;
        self
    }

    /// Set the update frequency class
    pub fn with_frequency(mut self, frequency: UpdateFrequency) -> Self {
        self.update_frequency = frequency;
        self
    }

    /// Set whether the variable is announced
    pub fn announced(mut self, announced: bool) -> Self {
        self.is_announced = announced;
        self
    }

    /// Set the variable kind
    pub fn with_kind(mut self, kind: VariableKind) -> Self {
        self.kind = kind;
        self
    }

    /// Look up the description registered for a value
    pub fn describe(&self, value: f64) -> Option<&str> {
        self.value_descriptions
            .iter()
            .find(|(v, _)| *v == value)
            .map(|(_, d)| d.as_str())
    }

    /// True if the continuous monitor should watch this variable
    pub fn is_monitored(&self) -> bool {
        self.is_announced && self.update_frequency == UpdateFrequency::Continuous
    }

    /// Spoken form of a value: its description, or `"<display name>: <value>"`
    pub fn spoken_value(&self, value: f64) -> String {
        match self.describe(value) {
            Some(desc) => desc.to_string(),
            None => format!("{}: {}", self.display_name, format_value(value)),
        }
    }
}

/// Format a value for speech: integers without a fractional part, others
/// with at most two decimals.
pub fn format_value(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        let s = format!("{:.2}", value);
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

/// Change-detection equality: NaN matches NaN
pub fn same_value(a: f64, b: f64) -> bool {
    a == b || (a.is_nan() && b.is_nan())
}

/// Connection status of the simulator link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConnectionStatus {
    /// Not connected to the simulator
    #[default]
    Disconnected,
    /// Connected and dispatching
    Connected,
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionStatus::Disconnected => write!(f, "Disconnected"),
            ConnectionStatus::Connected => write!(f, "Connected"),
        }
    }
}

/// Snapshot of the bounded queue's diagnostic counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QueueStats {
    /// Configured capacity
    pub capacity: usize,
    /// Events currently queued
    pub queued_count: usize,
    /// Events rejected because the queue was full
    pub dropped_count: u64,
    /// Number of scheduler ticks that drained at least one event
    pub processed_batches: u64,
}

impl QueueStats {
    /// True when depth exceeds half the capacity
    pub fn is_underrun(&self) -> bool {
        self.queued_count > self.capacity / 2
    }
}

/// Result of a single scheduler tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TickReport {
    /// Queue depth before draining
    pub depth_before: usize,
    /// Queue depth after draining
    pub depth_after: usize,
    /// Events dispatched during this tick
    pub dispatched: usize,
    /// Events whose dispatch panicked and was contained
    pub failed: usize,
}

/// Health report exposed to operators
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthSnapshot {
    /// Queue counters
    pub queue: QueueStats,
    /// Most recent tick
    pub last_tick: TickReport,
    /// Whether queue depth is above half capacity
    pub underrun: bool,
    /// Connection status at capture time
    pub connection: ConnectionStatus,
    /// Capture timestamp
    pub captured_at: chrono::DateTime<chrono::Utc>,
}
