//! Front-controller request dispatch with filter hooks and view resolution.
//!
//! `switchyard-dispatch` maps a request path to a controller method, runs
//! filters around the call, and renders the view the method chose. It is
//! designed to work with any template engine: rendering goes through the
//! [`TemplateRenderer`] trait (see `switchyard-render` for a MiniJinja one).
//!
//! # Features
//!
//! - **Controller routing**: `controller/method` paths, default controller,
//!   default `index` method, per-controller catch-all
//! - **Context and views**: per-request [`Context`] store and [`ViewRegistry`]
//! - **Filters**: ordered pre/post-controller hooks ([`FilterRegistry`])
//! - **View components**: controller-like objects rendered in place of a view
//! - **Sub-views**: templates render further view keys through [`ViewScope`]
//! - **Collaborator traits**: [`InstanceLocator`], [`Configuration`],
//!   [`TemplateRenderer`], with small default implementations
//!
//! # Pipeline
//!
//! ```text
//! RequestMatch
//!   → Dispatcher (controller lookup, method resolution)
//!   → FilterRegistry (pre-controller)
//!   → controller method
//!   → FilterRegistry (post-controller)
//!   → ViewResolver (optional view component, filtered)
//!   → TemplateRenderer
//! ```
//!
//! # Single-Threaded Design
//!
//! A dispatch runs start to finish on one thread with no suspension points.
//! Services are shared through `Rc`; every request gets fresh controller and
//! component instances, so no state crosses request boundaries.
//!
//! # Usage
//!
//! ```rust,ignore
//! use switchyard_dispatch::{DispatcherBuilder, InstanceRegistry, RequestMatch, Settings};
//!
//! let dispatcher = DispatcherBuilder::new()
//!     .locator(InstanceRegistry::new().controller("users", Users::default))
//!     .config(Settings::from_file("switchyard.yaml")?)
//!     .build(renderer)?;
//!
//! let body = dispatcher.handle_request(&RequestMatch::new("/").with_path("users/show"))?;
//! ```

// Core modules
mod config;
mod context;
mod dispatch;
mod error;
mod handler;
mod hooks;
mod locator;
mod render;
mod resolve;
mod views;

// Re-export core types
pub use config::{
    ConfigError, Configuration, Settings, DEFAULT_CONTROLLER, DEFAULT_VIEW_EXTENSION,
    VIEWS_DIRECTORY, VIEW_EXTENSION,
};

pub use context::Context;

pub use dispatch::{
    controller_and_method, split_request, Dispatcher, DispatcherBuilder, RequestMatch, BASE_URL,
    DEFAULT_METHOD,
};

pub use error::{BoxError, DispatchError, ErrorKind, KeyScope};

pub use handler::{
    Action, ActionResult, Component, Controller, ControllerState, Dispatchable, Outcome,
    ResolvedAction, Services,
};

pub use hooks::{
    Filter, FilterError, FilterFn, FilterRegistry, FilterTarget, FilterVerdict, Hook, TargetKind,
};

pub use locator::{Category, Instance, InstanceFactory, InstanceLocator, InstanceRegistry};

pub use render::{
    from_fn, json_render, Bindings, FnRenderer, RenderError, SubViews, TemplateRenderer, ViewScope,
};

pub use resolve::{template_path, ViewResolver, INITIAL_VIEW, MAX_VIEW_DEPTH};

pub use views::ViewRegistry;
