//! Variable definition registry
//!
//! The registry maps a variable key to its [`VariableDefinition`] and lists the
//! display variables of each panel. The dispatch pipeline only ever reads from
//! it; a new registry replaces the old one wholesale on aircraft switch.
//!
//! Catalogs themselves are supplied by the host application. [`StaticRegistry`]
//! is an in-memory implementation that can be built in code or loaded from a
//! JSON catalog:
//!
//! ```json
//! {
//!   "variables": [
//!     { "key": "A32NX_FMGC_FLIGHT_PHASE", "display_name": "Flight phase",
//!       "value_descriptions": [[4.0, "Climb"], [5.0, "Cruise"]] }
//!   ],
//!   "panels": { "FCU": ["FCU_HEADING", "FCU_SPEED"] }
//! }
//! ```

use crate::error::{Result, ResultExt, SimVoxError};
use crate::types::VariableDefinition;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

/// Read-only lookup of variable metadata
pub trait VariableRegistry: Send + Sync {
    /// Definition for a key, if registered
    fn definition(&self, key: &str) -> Option<&VariableDefinition>;

    /// Ordered display variables of a panel (empty for unknown panels)
    fn display_variables(&self, panel: &str) -> &[String];

    /// True if the key appears in any panel's display list
    fn is_display_variable(&self, key: &str) -> bool;

    /// Names of all panels
    fn panels(&self) -> Vec<String>;
}

/// On-disk catalog format
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryCatalog {
    /// Variable definitions
    #[serde(default)]
    pub variables: Vec<VariableDefinition>,
    /// Panel name → ordered display variable keys
    #[serde(default)]
    pub panels: BTreeMap<String, Vec<String>>,
}

/// In-memory registry
#[derive(Debug, Clone, Default)]
pub struct StaticRegistry {
    definitions: HashMap<String, VariableDefinition>,
    panels: BTreeMap<String, Vec<String>>,
    display_index: HashSet<String>,
}

impl StaticRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a definition, replacing any previous definition with the same key
    pub fn with_definition(mut self, definition: VariableDefinition) -> Self {
        self.insert(definition);
        self
    }

    /// Register a panel and its ordered display variables
    pub fn with_panel<I, S>(mut self, panel: impl Into<String>, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let keys: Vec<String> = keys.into_iter().map(Into::into).collect();
        self.display_index.extend(keys.iter().cloned());
        self.panels.insert(panel.into(), keys);
        self
    }

    /// Add a definition in place
    pub fn insert(&mut self, definition: VariableDefinition) {
        self.definitions.insert(definition.key.clone(), definition);
    }

    /// Number of definitions
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// True if no definitions are registered
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Build a registry from a catalog
    pub fn from_catalog(catalog: RegistryCatalog) -> Result<Self> {
        let mut registry = Self::new();
        for definition in catalog.variables {
            if registry.definitions.contains_key(&definition.key) {
                return Err(SimVoxError::Registry(format!(
                    "Duplicate variable key '{}'",
                    definition.key
                )));
            }
            let descriptions = &definition.value_descriptions;
            let repeated = descriptions.iter().enumerate().find_map(|(i, (v, _))| {
                descriptions[..i]
                    .iter()
                    .any(|(earlier, _)| earlier == v)
                    .then_some(*v)
            });
            if let Some(value) = repeated {
                return Err(SimVoxError::Registry(format!(
                    "Variable '{}' describes value {} more than once",
                    definition.key, value
                )));
            }
            registry.insert(definition);
        }
        for (panel, keys) in catalog.panels {
            registry = registry.with_panel(panel, keys);
        }
        Ok(registry)
    }

    /// Parse a JSON catalog
    pub fn from_json_str(json: &str) -> Result<Self> {
        let catalog: RegistryCatalog = serde_json::from_str(json)?;
        Self::from_catalog(catalog)
    }

    /// Load a JSON catalog from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            SimVoxError::Registry(format!("Failed to read catalog {:?}: {}", path, e))
        })?;
        let registry = Self::from_json_str(&content)
            .with_context(|| format!("Failed to load catalog {:?}", path))?;
        tracing::info!(
            "Loaded {} variable definitions and {} panels from {:?}",
            registry.len(),
            registry.panels.len(),
            path
        );
        Ok(registry)
    }
}

impl VariableRegistry for StaticRegistry {
    fn definition(&self, key: &str) -> Option<&VariableDefinition> {
        self.definitions.get(key)
    }

    fn display_variables(&self, panel: &str) -> &[String] {
        self.panels.get(panel).map(Vec::as_slice).unwrap_or(&[])
    }

    fn is_display_variable(&self, key: &str) -> bool {
        self.display_index.contains(key)
    }

    fn panels(&self) -> Vec<String> {
        self.panels.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"{
        "variables": [
            { "key": "A32NX_FMGC_FLIGHT_PHASE", "display_name": "Flight phase",
              "value_descriptions": [[4.0, "Climb"], [5.0, "Cruise"]] },
            { "key": "FCU_HEADING", "display_name": "Heading", "units": "degrees",
              "update_frequency": "Continuous", "is_announced": true }
        ],
        "panels": { "FCU": ["FCU_HEADING", "FCU_SPEED"] }
    }"#;

    #[test]
    fn test_from_json_catalog() {
        let registry = StaticRegistry::from_json_str(CATALOG).unwrap();
        assert_eq!(registry.len(), 2);

        let phase = registry.definition("A32NX_FMGC_FLIGHT_PHASE").unwrap();
        assert_eq!(phase.describe(4.0), Some("Climb"));

        let heading = registry.definition("FCU_HEADING").unwrap();
        assert!(heading.is_monitored());
        assert_eq!(heading.units, "degrees");
    }

    #[test]
    fn test_panel_lookup() {
        let registry = StaticRegistry::from_json_str(CATALOG).unwrap();
        assert_eq!(registry.display_variables("FCU"), ["FCU_HEADING", "FCU_SPEED"]);
        assert!(registry.display_variables("OVERHEAD").is_empty());
        assert!(registry.is_display_variable("FCU_SPEED"));
        assert!(!registry.is_display_variable("A32NX_FMGC_FLIGHT_PHASE"));
        assert_eq!(registry.panels(), vec!["FCU".to_string()]);
    }

    #[test]
    fn test_unknown_key_is_none() {
        let registry = StaticRegistry::new();
        assert!(registry.definition("NOPE").is_none());
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let json = r#"{ "variables": [
            { "key": "A", "display_name": "A" },
            { "key": "A", "display_name": "Again" }
        ] }"#;
        let err = StaticRegistry::from_json_str(json).unwrap_err();
        assert!(matches!(err, SimVoxError::Registry(_)));
    }

    #[test]
    fn test_duplicate_value_description_rejected() {
        let json = r#"{ "variables": [
            { "key": "A32NX_FMGC_FLIGHT_PHASE", "display_name": "Flight phase",
              "value_descriptions": [[4.0, "Climb"], [4.0, "Cruise"]] }
        ] }"#;
        let err = StaticRegistry::from_json_str(json).unwrap_err();
        match err {
            SimVoxError::Registry(msg) => assert!(msg.contains("A32NX_FMGC_FLIGHT_PHASE")),
            other => panic!("expected registry error, got {:?}", other),
        }
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a32nx.json");
        std::fs::write(&path, CATALOG).unwrap();

        let registry = StaticRegistry::load(&path).unwrap();
        assert_eq!(registry.len(), 2);

        let missing = StaticRegistry::load(dir.path().join("missing.json"));
        assert!(missing.is_err());
    }
}
