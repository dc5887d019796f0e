//! View-key to view-identifier mapping.

use std::collections::HashMap;

use crate::error::DispatchError;

/// Per-controller mapping from logical view keys to view identifiers.
///
/// A view identifier names a template (and, optionally, a view component
/// registered under the same name).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewRegistry {
    views: HashMap<String, String>,
}

impl ViewRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps `key` to `view`, replacing any previous mapping.
    pub fn set_view(&mut self, key: impl Into<String>, view: impl Into<String>) {
        self.views.insert(key.into(), view.into());
    }

    /// Removes the mapping for `key`. Absent keys are ignored.
    pub fn unset_view(&mut self, key: &str) {
        self.views.remove(key);
    }

    /// Returns the view mapped to `key`.
    pub fn get_view(&self, key: &str) -> Result<&str, DispatchError> {
        self.views
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| DispatchError::view_key(key))
    }

    /// Returns `true` if `key` is mapped.
    pub fn has_view(&self, key: &str) -> bool {
        self.views.contains_key(key)
    }

    /// Returns the view mapped to `key`, or `default` when unmapped.
    ///
    /// Fails with [`DispatchError::Configuration`] when the key is unmapped and
    /// no default is given.
    pub fn resolve_view_or_default<'a>(
        &'a self,
        key: &str,
        default: Option<&'a str>,
    ) -> Result<&'a str, DispatchError> {
        match (self.views.get(key), default) {
            (Some(view), _) => Ok(view.as_str()),
            (None, Some(default)) => Ok(default),
            (None, None) => Err(DispatchError::Configuration(format!(
                "view key '{}' not set",
                key
            ))),
        }
    }
}
