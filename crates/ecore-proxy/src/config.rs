//! Bridge configuration (TOML)
//!
//! ```toml
//! trace_calls = true
//!
//! [validation]
//! value_kinds = true
//! element_classes = true
//!
//! [heap]
//! max_objects = 100000
//! reuse_slots = true
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, BridgeResult};

/// Top-level bridge configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BridgeConfig {
    /// Emit a `trace` event for every boundary call
    #[serde(default)]
    pub trace_calls: bool,

    /// Checks performed on the proxy side before calling the boundary
    #[serde(default)]
    pub validation: ValidationConfig,

    /// Settings for the in-memory reference heap
    #[serde(default)]
    pub heap: HeapConfig,
}

/// Proxy-side validation switches.
///
/// Feature-id range checks and null-handle checks are always on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ValidationConfig {
    /// Reject `e_set` values whose kind doesn't match the feature
    #[serde(default = "default_true")]
    pub value_kinds: bool,

    /// Reject collection elements whose dynamic class doesn't match
    #[serde(default = "default_true")]
    pub element_classes: bool,
}

/// In-memory heap settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct HeapConfig {
    /// Maximum number of live objects (lists included); unlimited if absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_objects: Option<usize>,

    /// Reuse freed slots (with a bumped generation) for new objects
    #[serde(default = "default_true")]
    pub reuse_slots: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            value_kinds: true,
            element_classes: true,
        }
    }
}

impl Default for HeapConfig {
    fn default() -> Self {
        Self {
            max_objects: None,
            reuse_slots: true,
        }
    }
}

impl BridgeConfig {
    /// Parse configuration from a TOML string
    pub fn from_toml_str(content: &str) -> BridgeResult<Self> {
        let config: BridgeConfig =
            toml::from_str(content).map_err(|e| BridgeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> BridgeResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Serialize back to TOML
    pub fn to_toml_string(&self) -> BridgeResult<String> {
        toml::to_string_pretty(self).map_err(|e| BridgeError::Config(e.to_string()))
    }

    /// Check values serde can't express
    pub fn validate(&self) -> BridgeResult<()> {
        if self.heap.max_objects == Some(0) {
            return Err(BridgeError::Config(
                "heap.max_objects must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = BridgeConfig::from_toml_str("").unwrap();
        assert_eq!(config, BridgeConfig::default());
        assert!(!config.trace_calls);
        assert!(config.validation.value_kinds);
        assert!(config.validation.element_classes);
        assert!(config.heap.reuse_slots);
        assert_eq!(config.heap.max_objects, None);
    }

    #[test]
    fn test_partial_sections() {
        let config = BridgeConfig::from_toml_str(
            r#"
trace_calls = true

[heap]
max_objects = 16
"#,
        )
        .unwrap();
        assert!(config.trace_calls);
        assert_eq!(config.heap.max_objects, Some(16));
        assert!(config.heap.reuse_slots);
        assert!(config.validation.value_kinds);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let result = BridgeConfig::from_toml_str("[heap]\nmax_object = 3\n");
        assert!(matches!(result, Err(BridgeError::Config(_))));
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let result = BridgeConfig::from_toml_str("[heap]\nmax_objects = 0\n");
        assert!(matches!(result, Err(BridgeError::Config(_))));
    }

    #[test]
    fn test_toml_roundtrip() {
        let mut config = BridgeConfig::default();
        config.validation.value_kinds = false;
        config.heap.max_objects = Some(8);
        let text = config.to_toml_string().unwrap();
        assert_eq!(BridgeConfig::from_toml_str(&text).unwrap(), config);
    }
}
