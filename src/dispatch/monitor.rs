//! Change-detecting monitor for continuously reported variables.
//!
//! The monitor speaks a variable only when its value differs from the value
//! it last saw. While announcements are disabled, or during the grace period
//! after connect/aircraft switch, values are still recorded as the baseline
//! but nothing is spoken. This keeps the burst of initial values from turning
//! into an announcement flood.

use crate::types::{same_value, VariableDefinition};
use std::collections::HashMap;
use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct ContinuousMonitor {
    last_seen: HashMap<String, f64>,
    enabled: bool,
    grace_period: Duration,
    grace_until: Option<Instant>,
}

impl ContinuousMonitor {
    pub fn new(grace_period: Duration) -> Self {
        Self {
            last_seen: HashMap::new(),
            enabled: true,
            grace_period,
            grace_until: None,
        }
    }

    /// Suppress announcements for the grace period starting at `now`
    pub fn begin_grace(&mut self, now: Instant) {
        self.grace_until = Some(now + self.grace_period);
    }

    /// Enable or disable announcements
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// True if a change observed at `now` would be spoken
    pub fn is_announcing(&self, now: Instant) -> bool {
        self.enabled && self.grace_until.map_or(true, |until| now >= until)
    }

    /// Forget every baseline (aircraft switch)
    pub fn reset(&mut self) {
        self.last_seen.clear();
    }

    /// Record a value and return the text to speak, if any
    pub fn observe(
        &mut self,
        definition: &VariableDefinition,
        value: f64,
        now: Instant,
    ) -> Option<String> {
        let previous = self.last_seen.insert(definition.key.clone(), value);
        if !self.is_announcing(now) {
            return None;
        }
        match previous {
            Some(prev) if same_value(prev, value) => None,
            _ => Some(definition.spoken_value(value)),
        }
    }
}
