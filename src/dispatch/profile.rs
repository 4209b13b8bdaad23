//! Aircraft-specific interception
//!
//! The active profile sees every event that no terminal rule claimed. It may
//! fully handle an event (returning `true`), in which case the dispatcher stops
//! there.

use crate::registry::VariableRegistry;
use crate::types::VariableUpdateEvent;
use crate::ui::Announcer;
use std::collections::HashMap;

/// Read-only view handed to profiles
pub struct ProfileContext<'a> {
    pub registry: &'a dyn VariableRegistry,
    pub announcer: &'a dyn Announcer,
    /// Last known value of every variable, including the current event
    pub values: &'a HashMap<String, f64>,
}

/// Per-aircraft behavior plugged into the pipeline
pub trait AircraftProfile: Send {
    /// Human readable profile name
    fn name(&self) -> &str;

    /// Returns true if the event was fully handled
    fn intercept(&mut self, event: &VariableUpdateEvent, ctx: &ProfileContext<'_>) -> bool;

    /// Drop any state accumulated for the previous session
    fn reset(&mut self) {}
}

/// Profile that never intercepts
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProfile;

impl AircraftProfile for NoProfile {
    fn name(&self) -> &str {
        "none"
    }

    fn intercept(&mut self, _event: &VariableUpdateEvent, _ctx: &ProfileContext<'_>) -> bool {
        false
    }
}

type CompositeFormat = Box<dyn Fn(&[f64]) -> String + Send>;

/// Several raw variables spoken as one sentence
pub struct CompositeGroup {
    name: String,
    keys: Vec<String>,
    format: CompositeFormat,
    fresh: HashMap<String, f64>,
}

impl CompositeGroup {
    /// `format` receives the values in the order of `keys`
    pub fn new<I, S, F>(name: impl Into<String>, keys: I, format: F) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(&[f64]) -> String + Send + 'static,
    {
        Self {
            name: name.into(),
            keys: keys.into_iter().map(Into::into).collect(),
            format: Box::new(format),
            fresh: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    fn contains(&self, key: &str) -> bool {
        self.keys.iter().any(|k| k == key)
    }

    /// Record a part; returns the sentence once every part is fresh
    fn offer(&mut self, key: &str, value: f64) -> Option<String> {
        self.fresh.insert(key.to_string(), value);
        let values: Option<Vec<f64>> = self
            .keys
            .iter()
            .map(|k| self.fresh.get(k).copied())
            .collect();
        let values = values?;
        self.fresh.clear();
        Some((self.format)(&values))
    }
}

impl std::fmt::Debug for CompositeGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeGroup")
            .field("name", &self.name)
            .field("keys", &self.keys)
            .field("fresh", &self.fresh)
            .finish()
    }
}

/// Profile built from composite announcement groups
#[derive(Debug)]
pub struct CompositeProfile {
    name: String,
    groups: Vec<CompositeGroup>,
}

impl CompositeProfile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            groups: Vec::new(),
        }
    }

    pub fn with_group(mut self, group: CompositeGroup) -> Self {
        self.groups.push(group);
        self
    }

    pub fn groups(&self) -> &[CompositeGroup] {
        &self.groups
    }
}

impl AircraftProfile for CompositeProfile {
    fn name(&self) -> &str {
        &self.name
    }

    fn intercept(&mut self, event: &VariableUpdateEvent, ctx: &ProfileContext<'_>) -> bool {
        let Some(group) = self.groups.iter_mut().find(|g| g.contains(&event.name)) else {
            return false;
        };
        if let Some(text) = group.offer(&event.name, event.value) {
            tracing::trace!("Composite '{}' complete", group.name);
            ctx.announcer.announce(&text);
        }
        true
    }

    fn reset(&mut self) {
        for group in &mut self.groups {
            group.fresh.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::StaticRegistry;
    use crate::types::format_value;
    use crate::ui::MockAnnouncer;

    fn wind_profile() -> CompositeProfile {
        CompositeProfile::new("A32NX").with_group(CompositeGroup::new(
            "wind",
            ["AMBIENT_WIND_DIRECTION", "AMBIENT_WIND_VELOCITY"],
            |v| format!("Wind {} at {} knots", format_value(v[0]), format_value(v[1])),
        ))
    }

    #[test]
    fn test_no_profile_never_intercepts() {
        let registry = StaticRegistry::new();
        let announcer = MockAnnouncer::new();
        let values = HashMap::new();
        let ctx = ProfileContext {
            registry: &registry,
            announcer: &announcer,
            values: &values,
        };
        assert!(!NoProfile.intercept(&VariableUpdateEvent::new("ANY", 1.0), &ctx));
    }

    #[test]
    fn test_composite_waits_for_all_parts() {
        let registry = StaticRegistry::new();
        let mut announcer = MockAnnouncer::new();
        announcer
            .expect_announce()
            .withf(|text: &str| text == "Wind 270 at 15 knots")
            .times(1)
            .return_const(());
        let values = HashMap::new();
        let ctx = ProfileContext {
            registry: &registry,
            announcer: &announcer,
            values: &values,
        };

        let mut profile = wind_profile();
        assert!(profile.intercept(&VariableUpdateEvent::new("AMBIENT_WIND_DIRECTION", 270.0), &ctx));
        assert!(profile.intercept(&VariableUpdateEvent::new("AMBIENT_WIND_VELOCITY", 15.0), &ctx));
        assert!(!profile.intercept(&VariableUpdateEvent::new("FCU_SPEED", 250.0), &ctx));
    }

    #[test]
    fn test_reset_discards_partial_group() {
        let registry = StaticRegistry::new();
        let announcer = MockAnnouncer::new();
        let values = HashMap::new();
        let ctx = ProfileContext {
            registry: &registry,
            announcer: &announcer,
            values: &values,
        };

        let mut profile = wind_profile();
        profile.intercept(&VariableUpdateEvent::new("AMBIENT_WIND_DIRECTION", 270.0), &ctx);
        profile.reset();
        // Only one part is fresh again, so nothing is spoken
        profile.intercept(&VariableUpdateEvent::new("AMBIENT_WIND_VELOCITY", 15.0), &ctx);
        assert!(profile.groups()[0].fresh.len() == 1);
    }
}
