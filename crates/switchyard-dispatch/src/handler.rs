//! Controller and component types.
//!
//! This module provides the types request-handling code is written against.
//!
//! # Controllers
//!
//! A controller is a user type implementing [`Controller`]. It owns a
//! [`ControllerState`] (context, views, services) and exposes its methods
//! through a typed lookup:
//!
//! ```rust
//! use switchyard_dispatch::{Action, ActionResult, Controller, ControllerState, Outcome, RequestMatch};
//!
//! #[derive(Default)]
//! struct Users {
//!     state: ControllerState,
//! }
//!
//! impl Users {
//!     fn show(&mut self, _matches: &RequestMatch) -> ActionResult {
//!         self.state.set("name", "ada");
//!         Ok(Outcome::view("profile"))
//!     }
//! }
//!
//! impl Controller for Users {
//!     fn state(&self) -> &ControllerState {
//!         &self.state
//!     }
//!
//!     fn state_mut(&mut self) -> &mut ControllerState {
//!         &mut self.state
//!     }
//!
//!     fn action(&self, method: &str) -> Option<Action<Self>> {
//!         match method {
//!             "show" => Some(Users::show),
//!             _ => None,
//!         }
//!     }
//! }
//! ```
//!
//! The dispatcher never sees `Users` directly: every controller is also a
//! [`Dispatchable`], the object-safe form handed out by the instance locator.
//!
//! # Components
//!
//! A [`Component`] is a controller-like object registered under a view
//! identifier. When that view is rendered, the component receives a copy of
//! the controller's context, runs its [`handle`](Component::handle) between
//! the controller filters, and its own context becomes the view bindings.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use crate::config::Configuration;
use crate::context::Context;
use crate::dispatch::RequestMatch;
use crate::error::DispatchError;
use crate::hooks::FilterRegistry;
use crate::locator::InstanceLocator;
use crate::views::ViewRegistry;

/// The services a controller is initialized with before it handles a request.
#[derive(Clone)]
pub struct Services {
    /// Looks up controllers and view components
    pub locator: Rc<dyn InstanceLocator>,
    /// Filters run around controllers and components
    pub filters: Rc<FilterRegistry>,
    /// Application configuration
    pub config: Rc<dyn Configuration>,
}

impl Services {
    /// Bundles the three services.
    pub fn new(
        locator: Rc<dyn InstanceLocator>,
        filters: Rc<FilterRegistry>,
        config: Rc<dyn Configuration>,
    ) -> Self {
        Self {
            locator,
            filters,
            config,
        }
    }
}

impl fmt::Debug for Services {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Services")
            .field("filters", &self.filters)
            .finish_non_exhaustive()
    }
}

/// Per-request state carried by every controller and component.
///
/// Starts empty and uninitialized. The dispatcher (or the view resolver, for
/// components) calls [`initialize`](Self::initialize) before any method runs.
#[derive(Debug, Clone, Default)]
pub struct ControllerState {
    context: Context,
    views: ViewRegistry,
    services: Option<Services>,
}

impl ControllerState {
    /// Creates an empty, uninitialized state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches the request's services.
    pub fn initialize(&mut self, services: Services) {
        self.services = Some(services);
    }

    /// Returns `true` once [`initialize`](Self::initialize) has been called.
    pub fn is_initialized(&self) -> bool {
        self.services.is_some()
    }

    /// Returns the services attached by [`initialize`](Self::initialize).
    pub fn services(&self) -> Result<&Services, DispatchError> {
        self.services.as_ref().ok_or_else(|| {
            DispatchError::Configuration("controller used before initialization".into())
        })
    }

    /// The context store.
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// The context store, mutably.
    pub fn context_mut(&mut self) -> &mut Context {
        &mut self.context
    }

    /// The view registry.
    pub fn views(&self) -> &ViewRegistry {
        &self.views
    }

    /// The view registry, mutably.
    pub fn views_mut(&mut self) -> &mut ViewRegistry {
        &mut self.views
    }

    /// Shorthand for `context_mut().set(..)`.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.context.set(key, value);
    }

    /// Shorthand for `context().has(..)`.
    pub fn has(&self, key: &str) -> bool {
        self.context.has(key)
    }

    /// Shorthand for `context().get(..)`.
    pub fn get(&self, key: &str) -> Result<&Value, DispatchError> {
        self.context.get(key)
    }

    /// Shorthand for `views_mut().set_view(..)`.
    pub fn set_view(&mut self, key: impl Into<String>, view: impl Into<String>) {
        self.views.set_view(key, view);
    }

    /// Shorthand for `views_mut().unset_view(..)`.
    pub fn unset_view(&mut self, key: &str) {
        self.views.unset_view(key);
    }

    /// Shorthand for `views().get_view(..)`.
    pub fn get_view(&self, key: &str) -> Result<&str, DispatchError> {
        self.views.get_view(key)
    }
}

/// What a controller action produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Render the named view
    View(String),
    /// No view was chosen; rendering the initial view will fail
    NoView,
}

impl Outcome {
    /// Creates an outcome naming `id` as the view to render.
    pub fn view(id: impl Into<String>) -> Self {
        Outcome::View(id.into())
    }

    /// Returns the view identifier, if any.
    pub fn view_id(&self) -> Option<&str> {
        match self {
            Outcome::View(id) => Some(id),
            Outcome::NoView => None,
        }
    }
}

impl From<&str> for Outcome {
    fn from(id: &str) -> Self {
        Outcome::View(id.to_string())
    }
}

impl From<String> for Outcome {
    fn from(id: String) -> Self {
        Outcome::View(id)
    }
}

/// The result type for controller actions.
pub type ActionResult = Result<Outcome, anyhow::Error>;

/// A controller method, receiving the full request match.
pub type Action<C> = fn(&mut C, &RequestMatch) -> ActionResult;

/// Request-handling logic for one controller identifier.
pub trait Controller: Sized + 'static {
    /// The controller's per-request state.
    fn state(&self) -> &ControllerState;

    /// The controller's per-request state, mutably.
    fn state_mut(&mut self) -> &mut ControllerState;

    /// Looks up the method named `method`.
    fn action(&self, method: &str) -> Option<Action<Self>>;

    /// The method invoked for names [`action`](Self::action) does not know.
    fn catch_all(&self) -> Option<Action<Self>> {
        None
    }
}

/// A controller method resolved for one dispatch.
pub struct ResolvedAction {
    method: String,
    fallback: bool,
    target: Box<dyn Any>,
}

impl ResolvedAction {
    /// The method name that was requested.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Returns `true` if the catch-all stands in for the requested method.
    pub fn is_catch_all(&self) -> bool {
        self.fallback
    }
}

impl fmt::Debug for ResolvedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedAction")
            .field("method", &self.method)
            .field("fallback", &self.fallback)
            .finish_non_exhaustive()
    }
}

/// Object-safe form of a [`Controller`], as stored by the instance locator.
///
/// Implemented for every `Controller`; there is no need to implement it by
/// hand.
pub trait Dispatchable {
    /// The controller's per-request state.
    fn state(&self) -> &ControllerState;

    /// The controller's per-request state, mutably.
    fn state_mut(&mut self) -> &mut ControllerState;

    /// Resolves `method`, falling back to the catch-all.
    fn resolve(&self, method: &str) -> Option<ResolvedAction>;

    /// Invokes an action previously returned by [`resolve`](Self::resolve).
    fn invoke(&mut self, action: &ResolvedAction, matches: &RequestMatch) -> ActionResult;
}

impl<C: Controller> Dispatchable for C {
    fn state(&self) -> &ControllerState {
        Controller::state(self)
    }

    fn state_mut(&mut self) -> &mut ControllerState {
        Controller::state_mut(self)
    }

    fn resolve(&self, method: &str) -> Option<ResolvedAction> {
        let (target, fallback) = match self.action(method) {
            Some(action) => (action, false),
            None => (self.catch_all()?, true),
        };
        Some(ResolvedAction {
            method: method.to_string(),
            fallback,
            target: Box::new(target),
        })
    }

    fn invoke(&mut self, action: &ResolvedAction, matches: &RequestMatch) -> ActionResult {
        let target = action.target.downcast_ref::<Action<C>>().ok_or_else(|| {
            anyhow::anyhow!(
                "action '{}' was resolved against another controller type",
                action.method
            )
        })?;
        target(self, matches)
    }
}

/// A view component: controller-like logic registered under a view identifier.
pub trait Component {
    /// The component's per-request state.
    fn state(&self) -> &ControllerState;

    /// The component's per-request state, mutably.
    fn state_mut(&mut self) -> &mut ControllerState;

    /// Runs the component. Its context afterwards becomes the view bindings.
    fn handle(&mut self) -> Result<(), anyhow::Error>;
}
