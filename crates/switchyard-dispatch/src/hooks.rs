//! Filter hooks run around controllers and view components.
//!
//! Filters let cross-cutting concerns (authentication, auditing, shared
//! context) run around every controller method without touching its code.
//!
//! # Pipeline Position
//!
//! ```text
//! request path
//!   → controller located and initialized
//!   → PRE-CONTROLLER FILTERS  ← (auth checks, shared context)
//!   → controller method
//!   → POST-CONTROLLER FILTERS ← (auditing, context enrichment)
//!   → view resolution
//!       → PRE-CONTROLLER FILTERS  (against the view component, if any)
//!       → component handle
//!       → POST-CONTROLLER FILTERS
//!   → template render
//! ```
//!
//! # Verdicts
//!
//! A filter returns a [`FilterVerdict`]. Every filter registered for a hook
//! runs, in registration order, whatever the verdicts of the filters before
//! it: a [`FilterVerdict::Reject`] is logged and otherwise has no effect. To
//! stop a request, a filter returns an error instead.

use std::fmt;
use std::rc::Rc;

use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::handler::ControllerState;

/// Lifecycle points filters can attach to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hook {
    /// Before a controller method or component handler runs
    PreController,
    /// After a controller method or component handler returned successfully
    PostController,
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Hook::PreController => write!(f, "pre-controller"),
            Hook::PostController => write!(f, "post-controller"),
        }
    }
}

/// What a filter reports after running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterVerdict {
    /// The filter is satisfied
    Continue,
    /// The filter objects; the chain still continues
    Reject,
}

/// Error returned by a filter. Aborts the dispatch.
#[derive(Debug, Error)]
#[error("filter error ({hook}): {message}")]
pub struct FilterError {
    /// Human-readable error message
    pub message: String,
    /// The hook the failing filter was registered for
    pub hook: Hook,
    /// The underlying error source, if any
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl FilterError {
    /// Creates a filter error for `hook`.
    pub fn new(hook: Hook, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            hook,
            source: None,
        }
    }

    /// Creates a filter error for the pre-controller hook.
    pub fn pre_controller(message: impl Into<String>) -> Self {
        Self::new(Hook::PreController, message)
    }

    /// Creates a filter error for the post-controller hook.
    pub fn post_controller(message: impl Into<String>) -> Self {
        Self::new(Hook::PostController, message)
    }

    /// Sets the source error.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    {
        self.source = Some(source.into());
        self
    }
}

/// Whether a filter is running against a controller or a view component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    /// The request's controller
    Controller,
    /// A view component
    Component,
}

/// The instance a filter runs against.
#[derive(Debug)]
pub struct FilterTarget<'a> {
    /// Controller or component
    pub kind: TargetKind,
    /// Controller identifier, or the view identifier for components
    pub name: &'a str,
    /// The instance's state; filters may read and modify it
    pub state: &'a mut ControllerState,
}

impl<'a> FilterTarget<'a> {
    /// Creates a target for the controller registered as `name`.
    pub fn controller(name: &'a str, state: &'a mut ControllerState) -> Self {
        Self {
            kind: TargetKind::Controller,
            name,
            state,
        }
    }

    /// Creates a target for the component registered under view `name`.
    pub fn component(name: &'a str, state: &'a mut ControllerState) -> Self {
        Self {
            kind: TargetKind::Component,
            name,
            state,
        }
    }
}

/// Type alias for filter functions.
pub type FilterFn = Rc<dyn Fn(&mut FilterTarget<'_>) -> Result<FilterVerdict, FilterError>>;

/// A filter with a method per hook.
///
/// Register it with [`FilterRegistry::filter`] to attach it to both hooks.
pub trait Filter {
    /// Runs before the controller method.
    fn filter_pre_controller(
        &self,
        _target: &mut FilterTarget<'_>,
    ) -> Result<FilterVerdict, FilterError> {
        Ok(FilterVerdict::Continue)
    }

    /// Runs after the controller method.
    fn filter_post_controller(
        &self,
        _target: &mut FilterTarget<'_>,
    ) -> Result<FilterVerdict, FilterError> {
        Ok(FilterVerdict::Continue)
    }
}

/// Filters registered per hook, kept in registration order.
#[derive(Clone, Default)]
pub struct FilterRegistry {
    pre_controller: Vec<FilterFn>,
    post_controller: Vec<FilterFn>,
}

impl FilterRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if no filters are registered.
    pub fn is_empty(&self) -> bool {
        self.pre_controller.is_empty() && self.post_controller.is_empty()
    }

    /// Adds a pre-controller filter.
    ///
    /// # Example
    ///
    /// ```rust
    /// use switchyard_dispatch::{FilterRegistry, FilterVerdict};
    ///
    /// let filters = FilterRegistry::new().pre_controller(|target| {
    ///     target.state.set("signedIn", false);
    ///     Ok(FilterVerdict::Continue)
    /// });
    /// ```
    pub fn pre_controller<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut FilterTarget<'_>) -> Result<FilterVerdict, FilterError> + 'static,
    {
        self.register(Hook::PreController, f);
        self
    }

    /// Adds a post-controller filter.
    pub fn post_controller<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut FilterTarget<'_>) -> Result<FilterVerdict, FilterError> + 'static,
    {
        self.register(Hook::PostController, f);
        self
    }

    /// Adds a [`Filter`] to both hooks.
    pub fn filter<T: Filter + 'static>(mut self, filter: T) -> Self {
        let filter = Rc::new(filter);
        let pre = Rc::clone(&filter);
        self.register(Hook::PreController, move |target| {
            pre.filter_pre_controller(target)
        });
        self.register(Hook::PostController, move |target| {
            filter.filter_post_controller(target)
        });
        self
    }

    /// Appends `f` to the filters of `hook`.
    pub fn register<F>(&mut self, hook: Hook, f: F)
    where
        F: Fn(&mut FilterTarget<'_>) -> Result<FilterVerdict, FilterError> + 'static,
    {
        self.slot_mut(hook).push(Rc::new(f));
    }

    /// The filters registered for `hook`, in registration order.
    pub fn filters(&self, hook: Hook) -> &[FilterFn] {
        match hook {
            Hook::PreController => &self.pre_controller,
            Hook::PostController => &self.post_controller,
        }
    }

    /// Runs every filter registered for `hook` against `target`.
    ///
    /// Rejections do not stop the chain. The first error does.
    pub fn invoke(&self, hook: Hook, target: &mut FilterTarget<'_>) -> Result<(), FilterError> {
        for (index, filter) in self.filters(hook).iter().enumerate() {
            let verdict = filter(target).map_err(|err| {
                warn!(%hook, index, instance = target.name, error = %err, "filter failed");
                err
            })?;
            match verdict {
                FilterVerdict::Continue => {
                    trace!(%hook, index, instance = target.name, "filter passed");
                }
                FilterVerdict::Reject => {
                    debug!(%hook, index, instance = target.name, "filter rejected, continuing");
                }
            }
        }
        Ok(())
    }

    fn slot_mut(&mut self, hook: Hook) -> &mut Vec<FilterFn> {
        match hook {
            Hook::PreController => &mut self.pre_controller,
            Hook::PostController => &mut self.post_controller,
        }
    }
}

impl fmt::Debug for FilterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterRegistry")
            .field("pre_controller_count", &self.pre_controller.len())
            .field("post_controller_count", &self.post_controller.len())
            .finish()
    }
}
