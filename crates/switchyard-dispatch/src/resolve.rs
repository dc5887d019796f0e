//! View resolution.
//!
//! Turns a view key on a controller into rendered output:
//!
//! 1. The key is looked up in the controller's view registry (with an
//!    optional default).
//! 2. If a view component is registered under the resulting view identifier,
//!    it receives the controller's context, runs between the controller
//!    filters, and its context becomes the bindings.
//! 3. Otherwise the controller's own context is the bindings.
//! 4. The template `<viewsDirectory>/<view>.<viewExtension>` is rendered.
//!
//! While it renders, the template can resolve further view keys against the
//! same state through the [`ViewScope`] handed to the renderer. Those
//! sub-views go through the same four steps.

use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::{debug, trace};

use crate::config::{Configuration, DEFAULT_VIEW_EXTENSION, VIEWS_DIRECTORY, VIEW_EXTENSION};
use crate::error::DispatchError;
use crate::handler::{Component, ControllerState, Services};
use crate::hooks::{FilterTarget, Hook};
use crate::locator::{Category, Instance};
use crate::render::{Bindings, SubViews, TemplateRenderer, ViewScope};

/// View key the dispatcher registers a controller method's outcome under.
pub const INITIAL_VIEW: &str = "_initial";

/// How deep sub-views may nest before resolution fails.
pub const MAX_VIEW_DEPTH: usize = 16;

/// Resolves view keys and renders the matching templates.
#[derive(Clone)]
pub struct ViewResolver {
    renderer: Rc<dyn TemplateRenderer>,
    depth: usize,
}

impl ViewResolver {
    /// Creates a resolver rendering through `renderer`.
    pub fn new(renderer: Rc<dyn TemplateRenderer>) -> Self {
        Self { renderer, depth: 0 }
    }

    /// Nesting level of the views this resolver renders. Zero for the
    /// request's initial view.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Renders the view registered under `key` on `state`.
    ///
    /// `default` is used as the view identifier when `key` is not registered.
    /// The state must have been initialized with its services.
    pub fn resolve(
        &self,
        state: &ControllerState,
        key: &str,
        default: Option<&str>,
    ) -> Result<String, DispatchError> {
        let services = state.services()?;
        let view = state.views().resolve_view_or_default(key, default)?;
        debug!(key, view, depth = self.depth, "resolving view");

        let (bindings, scope) = match services.locator.locate(Category::Component, view, true) {
            None => (
                Bindings::from(state.context().snapshot()),
                state.clone(),
            ),
            Some(Instance::Component(mut component)) => {
                let bindings = forward(services, view, state, component.as_mut())?;
                (bindings, component.state().clone())
            }
            Some(other) => {
                return Err(DispatchError::Configuration(format!(
                    "instance registered for view '{}' is a {}, not a component",
                    view,
                    other.describe()
                )))
            }
        };

        let path = template_path(services.config.as_ref(), view)?;
        trace!(path = %path.display(), bindings = bindings.len(), "rendering template");
        let views: SubViews = Rc::new(StateScope {
            resolver: self.nested(),
            state: scope,
        });
        Ok(self.renderer.render_with_views(&path, &bindings, &views)?)
    }

    fn nested(&self) -> Self {
        Self {
            renderer: Rc::clone(&self.renderer),
            depth: self.depth + 1,
        }
    }
}

/// Sub-view access for one rendered template.
struct StateScope {
    resolver: ViewResolver,
    state: ControllerState,
}

impl ViewScope for StateScope {
    fn render_view(&self, key: &str, default: Option<&str>) -> Result<String, DispatchError> {
        if self.resolver.depth() > MAX_VIEW_DEPTH {
            return Err(DispatchError::Configuration(format!(
                "sub-view '{}' nested deeper than {} levels",
                key, MAX_VIEW_DEPTH
            )));
        }
        self.resolver.resolve(&self.state, key, default)
    }
}

/// Runs a view component on behalf of the controller and returns its bindings.
fn forward(
    services: &Services,
    view: &str,
    controller: &ControllerState,
    component: &mut dyn Component,
) -> Result<Bindings, DispatchError> {
    debug!(view, "forwarding to view component");

    let state = component.state_mut();
    state.initialize(services.clone());
    state.context_mut().extend_from(controller.context());

    services.filters.invoke(
        Hook::PreController,
        &mut FilterTarget::component(view, component.state_mut()),
    )?;
    component
        .handle()
        .map_err(|source| DispatchError::Component {
            view: view.to_string(),
            source: source.into(),
        })?;
    services.filters.invoke(
        Hook::PostController,
        &mut FilterTarget::component(view, component.state_mut()),
    )?;

    Ok(Bindings::from(component.state().context().snapshot()))
}

/// Builds `<viewsDirectory>/<view>.<viewExtension>` from configuration.
pub fn template_path(config: &dyn Configuration, view: &str) -> Result<PathBuf, DispatchError> {
    let directory = config.require(VIEWS_DIRECTORY)?;
    let extension = config
        .get(VIEW_EXTENSION)
        .unwrap_or_else(|| DEFAULT_VIEW_EXTENSION.to_string());
    Ok(Path::new(&directory).join(format!("{}.{}", view, extension)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::hooks::{FilterRegistry, FilterVerdict};
    use crate::locator::InstanceRegistry;
    use crate::render::{from_fn, RenderError};
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::rc::Rc;

    #[derive(Default)]
    struct Card {
        state: ControllerState,
    }

    impl Component for Card {
        fn state(&self) -> &ControllerState {
            &self.state
        }

        fn state_mut(&mut self) -> &mut ControllerState {
            &mut self.state
        }

        fn handle(&mut self) -> Result<(), anyhow::Error> {
            let name = self
                .state
                .get("name")?
                .as_str()
                .unwrap_or_default()
                .to_uppercase();
            self.state.set("name", name);
            Ok(())
        }
    }

    fn state_with(locator: InstanceRegistry, filters: FilterRegistry) -> ControllerState {
        let mut state = ControllerState::new();
        state.initialize(Services::new(
            Rc::new(locator),
            Rc::new(filters),
            Rc::new(Settings::new("views", "home")),
        ));
        state
    }

    /// Renders as "<path>|<sorted key=value pairs>".
    fn echo() -> impl TemplateRenderer {
        from_fn(|path, bindings| {
            let mut pairs: Vec<String> = bindings
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            pairs.sort();
            Ok(format!("{}|{}", path.display(), pairs.join(",")))
        })
    }

    #[test]
    fn test_template_path() {
        let settings = Settings::new("/srv/views", "home");
        assert_eq!(
            template_path(&settings, "users/profile").unwrap(),
            PathBuf::from("/srv/views/users/profile.jinja")
        );

        let settings = settings.with_view_extension("html");
        assert_eq!(
            template_path(&settings, "profile").unwrap(),
            PathBuf::from("/srv/views/profile.html")
        );

        let empty: HashMap<String, String> = HashMap::new();
        assert!(matches!(
            template_path(&empty, "profile"),
            Err(DispatchError::Configuration(_))
        ));
    }

    #[test]
    fn test_renders_controller_context_without_component() {
        let mut state = state_with(InstanceRegistry::new(), FilterRegistry::new());
        state.set("name", "ada");
        state.set_view("main", "profile");

        let out = ViewResolver::new(Rc::new(echo()))
            .resolve(&state, "main", None)
            .unwrap();
        assert_eq!(out, "views/profile.jinja|name=\"ada\"");
    }

    #[test]
    fn test_default_view_used_when_key_unset() {
        let state = state_with(InstanceRegistry::new(), FilterRegistry::new());
        let out = ViewResolver::new(Rc::new(echo()))
            .resolve(&state, "sidebar", Some("nav"))
            .unwrap();
        assert_eq!(out, "views/nav.jinja|");
    }

    #[test]
    fn test_unset_key_without_default_fails() {
        let state = state_with(InstanceRegistry::new(), FilterRegistry::new());
        let err = ViewResolver::new(Rc::new(echo()))
            .resolve(&state, INITIAL_VIEW, None)
            .unwrap_err();
        assert!(matches!(err, DispatchError::Configuration(_)));
    }

    #[test]
    fn test_uninitialized_state_fails() {
        let mut state = ControllerState::new();
        state.set_view("main", "profile");
        assert!(matches!(
            ViewResolver::new(Rc::new(echo())).resolve(&state, "main", None),
            Err(DispatchError::Configuration(_))
        ));
    }

    #[test]
    fn test_component_context_replaces_controller_context() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let pre_log = Rc::clone(&log);
        let post_log = Rc::clone(&log);
        let filters = FilterRegistry::new()
            .pre_controller(move |target| {
                pre_log
                    .borrow_mut()
                    .push(format!("pre {:?} {}", target.kind, target.name));
                Ok(FilterVerdict::Continue)
            })
            .post_controller(move |target| {
                post_log.borrow_mut().push(format!(
                    "post {} name={}",
                    target.name,
                    target.state.get("name").unwrap()
                ));
                Ok(FilterVerdict::Continue)
            });

        let locator = InstanceRegistry::new().component("profile", Card::default);
        let mut state = state_with(locator, filters);
        state.set("name", "ada");
        state.set_view("main", "profile");

        let out = ViewResolver::new(Rc::new(echo()))
            .resolve(&state, "main", None)
            .unwrap();

        assert_eq!(out, "views/profile.jinja|name=\"ADA\"");
        assert_eq!(state.get("name").unwrap(), "ada");
        assert_eq!(
            *log.borrow(),
            vec!["pre Component profile", "post profile name=\"ADA\""]
        );
    }

    #[test]
    fn test_component_failure_skips_post_filters() {
        struct Broken {
            state: ControllerState,
        }

        impl Component for Broken {
            fn state(&self) -> &ControllerState {
                &self.state
            }

            fn state_mut(&mut self) -> &mut ControllerState {
                &mut self.state
            }

            fn handle(&mut self) -> Result<(), anyhow::Error> {
                anyhow::bail!("widget exploded")
            }
        }

        let posts = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&posts);
        let filters = FilterRegistry::new().post_controller(move |_| {
            *counter.borrow_mut() += 1;
            Ok(FilterVerdict::Continue)
        });
        let locator = InstanceRegistry::new().component("profile", || Broken {
            state: ControllerState::new(),
        });
        let mut state = state_with(locator, filters);
        state.set_view("main", "profile");

        let err = ViewResolver::new(Rc::new(echo()))
            .resolve(&state, "main", None)
            .unwrap_err();
        assert!(matches!(err, DispatchError::Component { ref view, .. } if view == "profile"));
        assert_eq!(*posts.borrow(), 0);
    }

    #[test]
    fn test_non_component_instance_is_configuration_error() {
        let locator = InstanceRegistry::new()
            .factory(Category::Component, "profile", || Instance::other::<String>());
        let mut state = state_with(locator, FilterRegistry::new());
        state.set_view("main", "profile");

        let err = ViewResolver::new(Rc::new(echo()))
            .resolve(&state, "main", None)
            .unwrap_err();
        assert!(matches!(err, DispatchError::Configuration(_)));
    }

    #[test]
    fn test_missing_template_maps_to_template_not_found() {
        let mut state = state_with(InstanceRegistry::new(), FilterRegistry::new());
        state.set_view("main", "ghost");

        let renderer = from_fn(|path, _| Err(RenderError::TemplateNotFound(path.to_path_buf())));
        let err = ViewResolver::new(Rc::new(renderer))
            .resolve(&state, "main", None)
            .unwrap_err();
        assert!(
            matches!(err, DispatchError::TemplateNotFound(ref path) if path == Path::new("views/ghost.jinja"))
        );
    }

    /// Renders "<path>" and, for `profile`, appends its sidebar sub-view.
    struct WithSidebar {
        default: Option<&'static str>,
    }

    impl TemplateRenderer for WithSidebar {
        fn render(&self, path: &Path, _bindings: &Bindings) -> Result<String, RenderError> {
            Ok(format!("<{}>", path.display()))
        }

        fn render_with_views(
            &self,
            path: &Path,
            bindings: &Bindings,
            views: &SubViews,
        ) -> Result<String, RenderError> {
            let own = self.render(path, bindings)?;
            if !path.ends_with("profile.jinja") {
                return Ok(own);
            }
            let sidebar = views
                .render_view("sidebar", self.default)
                .map_err(|e| RenderError::sub_view("sidebar", e))?;
            Ok(format!("{}{}", own, sidebar))
        }
    }

    #[test]
    fn test_sub_view_by_key() {
        let mut state = state_with(InstanceRegistry::new(), FilterRegistry::new());
        state.set_view("main", "profile");
        state.set_view("sidebar", "nav");

        let out = ViewResolver::new(Rc::new(WithSidebar { default: Some("menu") }))
            .resolve(&state, "main", None)
            .unwrap();
        assert_eq!(out, "<views/profile.jinja><views/nav.jinja>");
    }

    #[test]
    fn test_sub_view_default() {
        let mut state = state_with(InstanceRegistry::new(), FilterRegistry::new());
        state.set_view("main", "profile");

        let out = ViewResolver::new(Rc::new(WithSidebar { default: Some("menu") }))
            .resolve(&state, "main", None)
            .unwrap();
        assert_eq!(out, "<views/profile.jinja><views/menu.jinja>");
    }

    #[test]
    fn test_sub_view_unset_without_default() {
        let mut state = state_with(InstanceRegistry::new(), FilterRegistry::new());
        state.set_view("main", "profile");

        let err = ViewResolver::new(Rc::new(WithSidebar { default: None }))
            .resolve(&state, "main", None)
            .unwrap_err();
        assert!(matches!(err, DispatchError::Configuration(ref m) if m.contains("sidebar")));
    }

    #[test]
    fn test_sub_view_nesting_is_bounded() {
        struct SelfIncluding;

        impl TemplateRenderer for SelfIncluding {
            fn render(&self, _path: &Path, _bindings: &Bindings) -> Result<String, RenderError> {
                Ok(String::new())
            }

            fn render_with_views(
                &self,
                _path: &Path,
                _bindings: &Bindings,
                views: &SubViews,
            ) -> Result<String, RenderError> {
                views
                    .render_view("main", None)
                    .map_err(|e| RenderError::sub_view("main", e))
            }
        }

        let mut state = state_with(InstanceRegistry::new(), FilterRegistry::new());
        state.set_view("main", "loop");

        let err = ViewResolver::new(Rc::new(SelfIncluding))
            .resolve(&state, "main", None)
            .unwrap_err();
        assert!(matches!(err, DispatchError::Configuration(ref m) if m.contains("nested deeper")));
    }
}
