//! Test data builders for registries, configs and events

use simvox::config::{AppConfig, MonitorConfig};
use simvox::types::VariableDefinition;
use simvox::StaticRegistry;

/// Builder for a small A32NX-like registry
pub struct RegistryBuilder {
    registry: StaticRegistry,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self {
            registry: StaticRegistry::new(),
        }
    }

    /// Flight phase with Climb = 4 and Cruise = 5
    pub fn flight_phase(mut self) -> Self {
        self.registry.insert(
            VariableDefinition::new("A32NX_FMGC_FLIGHT_PHASE", "Flight phase")
                .with_value(2.0, "Takeoff")
                .with_value(4.0, "Climb")
                .with_value(5.0, "Cruise"),
        );
        self
    }

    /// Gear handle, continuously announced
    pub fn gear(mut self) -> Self {
        self.registry.insert(
            VariableDefinition::new("A32NX_GEAR_HANDLE_POSITION", "Gear")
                .with_value(0.0, "Gear up")
                .with_value(1.0, "Gear down")
                .continuous_announced(),
        );
        self
    }

    /// FCU panel with three display variables
    pub fn fcu_panel(mut self) -> Self {
        self.registry.insert(
            VariableDefinition::new("A32NX_AUTOPILOT_HEADING_SELECTED", "Heading")
                .with_units("degrees"),
        );
        self.registry.insert(
            VariableDefinition::new("A32NX_AUTOPILOT_SPEED_SELECTED", "Speed").with_units("knots"),
        );
        self.registry.insert(
            VariableDefinition::new("A32NX_FCU_LOC_MODE_ACTIVE", "Localizer")
                .with_value(0.0, "Off")
                .with_value(1.0, "Armed"),
        );
        self.registry = self.registry.with_panel(
            "FCU",
            [
                "A32NX_AUTOPILOT_HEADING_SELECTED",
                "A32NX_AUTOPILOT_SPEED_SELECTED",
                "A32NX_FCU_LOC_MODE_ACTIVE",
            ],
        );
        self
    }

    pub fn definition(mut self, definition: VariableDefinition) -> Self {
        self.registry.insert(definition);
        self
    }

    pub fn build(self) -> StaticRegistry {
        self.registry
    }
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Default config without the monitor grace period
pub fn config_without_grace() -> AppConfig {
    AppConfig {
        monitor: MonitorConfig { grace_period_ms: 0 },
        ..AppConfig::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use simvox::VariableRegistry;

    #[test]
    fn test_registry_builder() {
        let registry = RegistryBuilder::new().flight_phase().fcu_panel().build();
        assert_eq!(registry.len(), 4);
        assert_eq!(registry.display_variables("FCU").len(), 3);
    }
}
