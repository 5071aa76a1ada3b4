//! Engine configuration.
//!
//! Configuration is plain data with serde support, so hosts can keep it in
//! their own settings files. TOML helpers are provided:
//!
//! ```
//! use canopy::model::{SelectionConfig, SelectionMode};
//!
//! let config = SelectionConfig::from_toml_str(r#"
//!     mode = "multiple"
//! "#).unwrap();
//!
//! assert_eq!(config.mode, SelectionMode::Multiple);
//! assert!(!config.cascade_into_hidden);
//! ```

use serde::{Deserialize, Serialize};

use canopy_core::Result;

use super::selection::SelectionMode;

/// Settings for a [`SelectionEngine`](super::SelectionEngine).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// The selection mode.
    pub mode: SelectionMode,
    /// Whether cascades also reach descendants that are currently hidden.
    pub cascade_into_hidden: bool,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            mode: SelectionMode::MultipleCascade,
            cascade_into_hidden: false,
        }
    }
}

impl SelectionConfig {
    /// Creates a configuration for `mode` with default settings otherwise.
    pub fn new(mode: SelectionMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Sets whether cascades reach hidden descendants.
    pub fn with_cascade_into_hidden(mut self, enabled: bool) -> Self {
        self.cascade_into_hidden = enabled;
        self
    }

    /// Parses a configuration from TOML. Missing keys take their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }

    /// Serializes the configuration to TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string(self)?)
    }
}
