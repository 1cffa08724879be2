//! Engine configuration.
//!
//! ```yaml
//! root_scope: ":root"
//! mode_attribute: data-spark-mode
//! strict_collisions: true
//! emit:
//!   minify: false
//!   indent: 2
//!   header: "generated by sparkc"
//! ```
//!
//! Every field has a default, so an empty document is a valid configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SparkError};

/// Options for a [`StyleRegistry`](crate::StyleRegistry).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SparkConfig {
    /// Selector that base tokens declare their custom properties under.
    pub root_scope: String,
    /// Attribute whose value selects a mode: `[data-spark-mode="dark"]`.
    pub mode_attribute: String,
    /// Reject classes and custom properties claimed by unrelated lineages.
    pub strict_collisions: bool,
    pub emit: EmitOptions,
}

impl Default for SparkConfig {
    fn default() -> Self {
        Self {
            root_scope: ":root".to_string(),
            mode_attribute: "data-spark-mode".to_string(),
            strict_collisions: true,
            emit: EmitOptions::default(),
        }
    }
}

impl SparkConfig {
    /// Parses a configuration from YAML. Empty input gives the defaults.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: SparkConfig = if yaml.trim().is_empty() {
            SparkConfig::default()
        } else {
            serde_yaml::from_str(yaml).map_err(|e| SparkError::parse(e.to_string()))?
        };
        config.validate()?;
        Ok(config)
    }

    /// Loads a configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| SparkError::Load {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_yaml(&content).map_err(|e| e.in_file(path))
    }

    /// Checks the fields that end up verbatim in selectors.
    pub fn validate(&self) -> Result<()> {
        if self.root_scope.trim().is_empty() {
            return Err(SparkError::Config {
                message: "root_scope must not be empty".to_string(),
            });
        }
        let attribute_ok = !self.mode_attribute.is_empty()
            && self
                .mode_attribute
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !attribute_ok {
            return Err(SparkError::Config {
                message: format!("invalid mode_attribute '{}'", self.mode_attribute),
            });
        }
        Ok(())
    }
}

/// How a [`Stylesheet`](crate::Stylesheet) is written out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmitOptions {
    /// Drop all optional whitespace.
    pub minify: bool,
    /// Spaces per nesting level in pretty output.
    pub indent: usize,
    /// Comment written at the top of the sheet.
    pub header: Option<String>,
}

impl Default for EmitOptions {
    fn default() -> Self {
        Self {
            minify: false,
            indent: 2,
            header: None,
        }
    }
}
