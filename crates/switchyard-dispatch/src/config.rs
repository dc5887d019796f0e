//! Configuration provider.
//!
//! The dispatcher reads three keys through [`Configuration`]:
//!
//! | Key | Meaning | Default |
//! |-----|---------|---------|
//! | `viewsDirectory` | Directory holding view templates | required |
//! | `controller` | Controller used when the request has no path | required |
//! | `viewExtension` | Template file extension, without the dot | `jinja` |
//!
//! [`Settings`] is the bundled provider, loaded from YAML:
//!
//! ```yaml
//! viewsDirectory: ./views
//! controller: home
//! viewExtension: html
//! siteName: Example     # free-form keys are kept too
//! port: 8080             # and read back as strings
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use thiserror::Error;

use crate::error::DispatchError;

/// Key of the views directory.
pub const VIEWS_DIRECTORY: &str = "viewsDirectory";
/// Key of the default controller identifier.
pub const DEFAULT_CONTROLLER: &str = "controller";
/// Key of the view template extension.
pub const VIEW_EXTENSION: &str = "viewExtension";

/// Extension used when `viewExtension` is not configured.
pub const DEFAULT_VIEW_EXTENSION: &str = "jinja";

/// Source of string configuration values.
pub trait Configuration {
    /// Returns the value for `key`, or `None` if it is not configured.
    fn get(&self, key: &str) -> Option<String>;

    /// Returns the value for `key`, failing when it is not configured.
    fn require(&self, key: &str) -> Result<String, DispatchError> {
        self.get(key).ok_or_else(|| {
            DispatchError::Configuration(format!("configuration key '{}' not set", key))
        })
    }
}

impl Configuration for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

/// Errors that can occur while loading [`Settings`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The settings file could not be read.
    #[error("failed to read settings '{}': {source}", path.display())]
    Io {
        /// Path that failed to read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The settings document is not valid YAML or has the wrong shape.
    #[error("invalid settings: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// YAML-backed configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Directory holding view templates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub views_directory: Option<String>,

    /// Controller used when the request carries no path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controller: Option<String>,

    /// Template file extension without the leading dot
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view_extension: Option<String>,

    /// Any other keys, with whatever YAML value they were given
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl Settings {
    /// Creates settings with the two required keys.
    pub fn new(views_directory: impl Into<String>, controller: impl Into<String>) -> Self {
        Self {
            views_directory: Some(views_directory.into()),
            controller: Some(controller.into()),
            ..Self::default()
        }
    }

    /// Sets the template extension.
    pub fn with_view_extension(mut self, extension: impl Into<String>) -> Self {
        self.view_extension = Some(extension.into());
        self
    }

    /// Adds a free-form key.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), Value::String(value.into()));
        self
    }

    /// Parses settings from a YAML document.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Reads and parses a YAML settings file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content)
    }
}

impl Configuration for Settings {
    fn get(&self, key: &str) -> Option<String> {
        match key {
            VIEWS_DIRECTORY => self.views_directory.clone(),
            DEFAULT_CONTROLLER => self.controller.clone(),
            VIEW_EXTENSION => Some(
                self.view_extension
                    .clone()
                    .unwrap_or_else(|| DEFAULT_VIEW_EXTENSION.to_string()),
            ),
            other => self.extra.get(other).and_then(value_string),
        }
    }
}

/// Reads a free-form YAML value as a configuration string. `null` is unset.
fn value_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        Value::Tagged(tagged) => value_string(&tagged.value),
        other => serde_yaml::to_string(other)
            .ok()
            .map(|s| s.trim_end().to_string()),
    }
}
