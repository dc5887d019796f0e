//! Request dispatch.
//!
//! The [`Dispatcher`] is the front controller. For each request it:
//!
//! ```text
//! RequestMatch (base, "controller/method")
//!   → controller identifier (or the configured default when no path is given)
//!   → instance locator → controller, initialized with services
//!   → base URL bound into the context as `base_url`
//!   → method resolution (named method, else catch-all, else not found)
//!   → pre-controller filters → method → post-controller filters
//!   → outcome registered as the "_initial" view
//!   → view resolution and template render
//! ```
//!
//! A failure at any step ends the dispatch and is returned to the caller.

use std::rc::Rc;

use tracing::{debug, trace, warn};

use crate::config::{Configuration, DEFAULT_CONTROLLER};
use crate::error::DispatchError;
use crate::handler::{Outcome, Services};
use crate::hooks::{FilterRegistry, FilterTarget, Hook};
use crate::locator::{Category, Instance, InstanceLocator};
use crate::render::TemplateRenderer;
use crate::resolve::{ViewResolver, INITIAL_VIEW};

/// Method invoked when the request names no method.
pub const DEFAULT_METHOD: &str = "index";

/// Context key the request's base URL is bound under, for every view.
pub const BASE_URL: &str = "base_url";

/// The match structure produced upstream of dispatch.
///
/// `base` is the full matched base path; `path` is the optional remaining
/// request path in `controller/method[/...]` form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestMatch {
    base: String,
    path: Option<String>,
}

impl RequestMatch {
    /// Creates a match with no request path.
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            path: None,
        }
    }

    /// Sets the remaining request path.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Builds a match from ordered capture groups: the base path first, then
    /// the optional request path.
    pub fn from_groups<I, S>(groups: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut groups = groups.into_iter().map(Into::into);
        let base = groups.next()?;
        Some(Self {
            base,
            path: groups.next(),
        })
    }

    /// The full matched base path.
    pub fn base(&self) -> &str {
        &self.base
    }

    /// The base path without its trailing slash.
    pub fn base_url(&self) -> &str {
        self.base.strip_suffix('/').unwrap_or(&self.base)
    }

    /// The remaining request path, if one was supplied.
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// The request path split on `/`. Empty when no path was supplied.
    pub fn segments(&self) -> Vec<&str> {
        self.path().map(split_request).unwrap_or_default()
    }

    /// The path segment at `index`, if present.
    pub fn segment(&self, index: usize) -> Option<&str> {
        self.segments().get(index).copied()
    }
}

/// Splits a request string into its `/`-separated segments.
///
/// For example, `"users/show/7"` becomes `["users", "show", "7"]`.
pub fn split_request(request: &str) -> Vec<&str> {
    if request.is_empty() {
        Vec::new()
    } else {
        request.split('/').collect()
    }
}

/// Picks the controller and method identifiers from a request string.
///
/// A missing method segment selects [`DEFAULT_METHOD`]. An empty one
/// (`"users/"`) is kept as the empty method name.
pub fn controller_and_method(request: &str) -> (&str, &str) {
    let segments = split_request(request);
    let controller = segments.first().copied().unwrap_or_default();
    let method = segments.get(1).copied().unwrap_or(DEFAULT_METHOD);
    (controller, method)
}

/// Front controller: routes requests to controllers and renders their views.
///
/// # Example
///
/// ```rust,ignore
/// let dispatcher = DispatcherBuilder::new()
///     .locator(InstanceRegistry::new().controller("users", Users::default))
///     .config(Settings::new("views", "users"))
///     .build(MiniJinjaRenderer::new())?;
///
/// let html = dispatcher.handle_request(&RequestMatch::new("/app/").with_path("users/show"))?;
/// ```
pub struct Dispatcher<R> {
    services: Services,
    renderer: Rc<R>,
}

impl<R: TemplateRenderer + 'static> Dispatcher<R> {
    /// Creates a dispatcher from its services and a renderer.
    pub fn new(services: Services, renderer: R) -> Self {
        Self {
            services,
            renderer: Rc::new(renderer),
        }
    }

    /// The services handed to every controller.
    pub fn services(&self) -> &Services {
        &self.services
    }

    /// The template renderer.
    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Dispatches one request and returns the rendered view.
    pub fn handle_request(&self, matches: &RequestMatch) -> Result<String, DispatchError> {
        let request = match matches.path() {
            Some(path) => path.to_string(),
            None => self.services.config.require(DEFAULT_CONTROLLER)?,
        };
        let (controller_id, method) = controller_and_method(&request);
        debug!(
            base = matches.base_url(),
            controller = controller_id,
            method,
            "dispatching request"
        );

        let mut controller =
            match self
                .services
                .locator
                .locate(Category::Controller, controller_id, false)
            {
                Some(Instance::Controller(controller)) => controller,
                Some(other) => {
                    return Err(DispatchError::Configuration(format!(
                        "controller '{}' does not implement Controller (got {})",
                        controller_id,
                        other.describe()
                    )))
                }
                None => {
                    return Err(DispatchError::NotFound(format!(
                        "controller '{}' not available",
                        controller_id
                    )))
                }
            };

        let state = controller.state_mut();
        state.initialize(self.services.clone());
        state.set(BASE_URL, matches.base_url());

        let action = controller.resolve(method).ok_or_else(|| {
            DispatchError::NotFound(format!("method '{}' not available", method))
        })?;
        trace!(method, catch_all = action.is_catch_all(), "method resolved");

        self.services.filters.invoke(
            Hook::PreController,
            &mut FilterTarget::controller(controller_id, controller.state_mut()),
        )?;
        let outcome = controller
            .invoke(&action, matches)
            .map_err(|source| {
                warn!(controller = controller_id, method, error = %source, "action failed");
                DispatchError::Action {
                    controller: controller_id.to_string(),
                    method: method.to_string(),
                    source: source.into(),
                }
            })?;
        self.services.filters.invoke(
            Hook::PostController,
            &mut FilterTarget::controller(controller_id, controller.state_mut()),
        )?;

        match outcome {
            Outcome::View(view) => controller.state_mut().set_view(INITIAL_VIEW, view),
            Outcome::NoView => controller.state_mut().unset_view(INITIAL_VIEW),
        }

        let renderer: Rc<dyn TemplateRenderer> = self.renderer.clone();
        ViewResolver::new(renderer).resolve(controller.state(), INITIAL_VIEW, None)
    }
}

/// Builder for [`Dispatcher`].
#[derive(Default)]
pub struct DispatcherBuilder {
    locator: Option<Rc<dyn InstanceLocator>>,
    filters: FilterRegistry,
    config: Option<Rc<dyn Configuration>>,
}

impl DispatcherBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the instance locator.
    pub fn locator<L: InstanceLocator + 'static>(mut self, locator: L) -> Self {
        self.locator = Some(Rc::new(locator));
        self
    }

    /// Sets the filter registry.
    pub fn filters(mut self, filters: FilterRegistry) -> Self {
        self.filters = filters;
        self
    }

    /// Sets the configuration provider.
    pub fn config<C: Configuration + 'static>(mut self, config: C) -> Self {
        self.config = Some(Rc::new(config));
        self
    }

    /// Builds the dispatcher. Fails if the locator or configuration is missing.
    pub fn build<R: TemplateRenderer + 'static>(self, renderer: R) -> Result<Dispatcher<R>, DispatchError> {
        let locator = self.locator.ok_or_else(|| {
            DispatchError::Configuration("dispatcher built without an instance locator".into())
        })?;
        let config = self.config.ok_or_else(|| {
            DispatchError::Configuration("dispatcher built without configuration".into())
        })?;
        Ok(Dispatcher::new(
            Services::new(locator, Rc::new(self.filters), config),
            renderer,
        ))
    }
}
