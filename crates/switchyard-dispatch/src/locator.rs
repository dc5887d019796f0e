//! Instance lookup.
//!
//! The dispatcher does not construct controllers itself. It asks an
//! [`InstanceLocator`] for a fresh instance per request, keyed by category
//! and identifier. [`InstanceRegistry`] is a small factory map implementing
//! the contract; applications with their own container implement the trait
//! directly.

use std::collections::HashMap;
use std::fmt;

use crate::handler::{Component, Controller, Dispatchable};

/// Kinds of instances the dispatcher asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Request controllers, keyed by the first path segment
    Controller,
    /// View components, keyed by view identifier
    Component,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Controller => write!(f, "Controller"),
            Category::Component => write!(f, "Component"),
        }
    }
}

/// An instance handed out by a locator.
pub enum Instance {
    /// Something implementing [`Controller`]
    Controller(Box<dyn Dispatchable>),
    /// Something implementing [`Component`]
    Component(Box<dyn Component>),
    /// Anything else; carries a type name for diagnostics
    Other(String),
}

impl Instance {
    /// Wraps a controller.
    pub fn controller<C: Controller>(controller: C) -> Self {
        Instance::Controller(Box::new(controller))
    }

    /// Wraps a component.
    pub fn component<T: Component + 'static>(component: T) -> Self {
        Instance::Component(Box::new(component))
    }

    /// Describes an instance that is neither a controller nor a component.
    pub fn other<T>() -> Self {
        Instance::Other(std::any::type_name::<T>().to_string())
    }

    /// Short description used in error messages.
    pub fn describe(&self) -> &str {
        match self {
            Instance::Controller(_) => "controller",
            Instance::Component(_) => "component",
            Instance::Other(name) => name,
        }
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Instance").field(&self.describe()).finish()
    }
}

/// Looks up instances by category and identifier.
pub trait InstanceLocator {
    /// Returns a fresh instance, or `None` when nothing is registered.
    ///
    /// `optional` tells the locator that absence is an expected outcome
    /// (view components); mandatory lookups (controllers) missing are
    /// reported by the caller as not found.
    fn locate(&self, category: Category, identifier: &str, optional: bool) -> Option<Instance>;
}

/// Factory producing one instance per lookup.
pub type InstanceFactory = Box<dyn Fn() -> Instance>;

/// Map of instance factories, keyed by category and identifier.
///
/// # Example
///
/// ```rust,ignore
/// let locator = InstanceRegistry::new()
///     .controller("users", Users::default)
///     .component("profile", ProfileCard::default);
/// ```
#[derive(Default)]
pub struct InstanceRegistry {
    factories: HashMap<(Category, String), InstanceFactory>,
}

impl InstanceRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a controller factory under `identifier`.
    pub fn controller<C, F>(self, identifier: impl Into<String>, factory: F) -> Self
    where
        C: Controller,
        F: Fn() -> C + 'static,
    {
        self.factory(Category::Controller, identifier, move || {
            Instance::controller(factory())
        })
    }

    /// Registers a component factory under the view identifier `view`.
    pub fn component<T, F>(self, view: impl Into<String>, factory: F) -> Self
    where
        T: Component + 'static,
        F: Fn() -> T + 'static,
    {
        self.factory(Category::Component, view, move || {
            Instance::component(factory())
        })
    }

    /// Registers a raw factory. Useful for containers that hand out
    /// arbitrary instances.
    pub fn factory<F>(mut self, category: Category, identifier: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Instance + 'static,
    {
        self.factories
            .insert((category, identifier.into()), Box::new(factory));
        self
    }

    /// Returns `true` if a factory is registered.
    pub fn contains(&self, category: Category, identifier: &str) -> bool {
        self.factories
            .contains_key(&(category, identifier.to_string()))
    }
}

impl InstanceLocator for InstanceRegistry {
    fn locate(&self, category: Category, identifier: &str, _optional: bool) -> Option<Instance> {
        self.factories
            .get(&(category, identifier.to_string()))
            .map(|factory| factory())
    }
}

impl fmt::Debug for InstanceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<String> = self
            .factories
            .keys()
            .map(|(category, id)| format!("{}:{}", category, id))
            .collect();
        keys.sort();
        f.debug_struct("InstanceRegistry")
            .field("factories", &keys)
            .finish()
    }
}
