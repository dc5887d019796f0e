//! Per-request context store.
//!
//! A [`Context`] is the key/value bag a controller fills while handling a
//! request. Its entries become the bindings of the rendered view.
//!
//! Presence is explicit: a key set to `null` is present, a key that was never
//! set is not, and reading it is an error rather than a silent `null`.

use std::collections::HashMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::DispatchError;

/// Mutable key/value store owned by a single controller or component.
///
/// # Example
///
/// ```rust
/// use switchyard_dispatch::Context;
/// use serde_json::json;
///
/// let mut ctx = Context::new();
/// ctx.set("title", "Profile");
/// ctx.set("visits", json!(3));
///
/// assert!(ctx.has("title"));
/// assert_eq!(ctx.get("visits")?, &json!(3));
/// assert!(ctx.get("missing").is_err());
/// # Ok::<(), switchyard_dispatch::DispatchError>(())
/// ```
#[derive(Clone, Default, PartialEq)]
pub struct Context {
    entries: HashMap<String, Value>,
}

impl Context {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the value stored under `key`.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Returns `true` if `key` has been set, even to `null`.
    pub fn has(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Returns the value stored under `key`.
    pub fn get(&self, key: &str) -> Result<&Value, DispatchError> {
        self.entries
            .get(key)
            .ok_or_else(|| DispatchError::context_key(key))
    }

    /// Deserializes the value stored under `key` into `T`.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<T, DispatchError> {
        let value = self.get(key)?;
        serde_json::from_value(value.clone()).map_err(|e| {
            DispatchError::Configuration(format!("context key '{}' has wrong shape: {}", key, e))
        })
    }

    /// Returns a read-only view of every entry.
    pub fn snapshot(&self) -> &HashMap<String, Value> {
        &self.entries
    }

    /// Copies every entry of `other` into this context, overwriting collisions.
    pub fn extend_from(&mut self, other: &Context) {
        for (key, value) in &other.entries {
            self.entries.insert(key.clone(), value.clone());
        }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing has been set.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&String> = self.entries.keys().collect();
        keys.sort();
        f.debug_struct("Context").field("keys", &keys).finish()
    }
}
