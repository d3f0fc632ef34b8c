// SPDX-License-Identifier: MIT OR Apache-2.0
//! Engine configuration.
//!
//! Stored as RON next to the graphs it applies to. Every field has a
//! default, so a partial file only overrides what it names.

use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Current configuration format version
pub const CONFIG_FORMAT_VERSION: u32 = 1;

/// How `update_compute_order` obtains node compute orders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ComputeOrderMode {
    /// Rewrite compute orders from a depth-first topological sort
    #[default]
    DepthFirst,
    /// Keep the compute orders supplied by the graph owner
    Manual,
}

/// Processor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Format version
    pub version: u32,
    /// Compute order source
    pub compute_order: ComputeOrderMode,
    /// Maximum stack pops in one conditional pass; `None` disables the guard
    pub max_steps: Option<u64>,
    /// Maximum iterations of a single loop encounter; larger ranges are clamped
    pub max_loop_iterations: Option<u64>,
    /// Report asymmetric type adapters when a processor is created
    pub validate_adapters: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_FORMAT_VERSION,
            compute_order: ComputeOrderMode::DepthFirst,
            max_steps: Some(100_000),
            max_loop_iterations: Some(10_000),
            validate_adapters: true,
        }
    }
}

impl EngineConfig {
    /// Configuration without step or iteration guards
    pub fn unbounded() -> Self {
        Self {
            max_steps: None,
            max_loop_iterations: None,
            ..Self::default()
        }
    }

    /// Parse from RON
    pub fn from_ron(s: &str) -> Result<Self> {
        let config: EngineConfig = ron::from_str(s)?;
        if config.version > CONFIG_FORMAT_VERSION {
            return Err(EngineError::UnsupportedVersion {
                found: config.version,
                supported: CONFIG_FORMAT_VERSION,
            });
        }
        Ok(config)
    }

    /// Serialize to RON
    pub fn to_ron(&self) -> std::result::Result<String, ron::Error> {
        let config = ron::ser::PrettyConfig::default()
            .struct_names(true)
            .enumerate_arrays(false);
        ron::ser::to_string_pretty(self, config)
    }

    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_ron(&content)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_ron()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.version, CONFIG_FORMAT_VERSION);
        assert_eq!(config.compute_order, ComputeOrderMode::DepthFirst);
        assert_eq!(config.max_steps, Some(100_000));
    }

    #[test]
    fn test_serialization() {
        let config = EngineConfig {
            compute_order: ComputeOrderMode::Manual,
            ..EngineConfig::unbounded()
        };
        let ron_str = config.to_ron().unwrap();
        let loaded = EngineConfig::from_ron(&ron_str).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let loaded = EngineConfig::from_ron("(max_steps: Some(10))").unwrap();
        assert_eq!(loaded.max_steps, Some(10));
        assert_eq!(loaded.max_loop_iterations, Some(10_000));
    }

    #[test]
    fn test_newer_version_rejected() {
        let result = EngineConfig::from_ron("(version: 99)");
        assert!(matches!(result, Err(EngineError::UnsupportedVersion { found: 99, .. })));
    }
}
