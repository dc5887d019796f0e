//! MiniJinja-backed view renderer.
//!
//! Dispatched renders expose a `view(key, default=none)` function that renders
//! another view of the same controller in place:
//!
//! ```jinja
//! <aside>{{ view("sidebar", "partials/nav") }}</aside>
//! ```
//!
//! MiniJinja functions must be `Send + Sync + 'static`, while the sub-view
//! scope is a per-request `Rc`. The scope is therefore kept on a thread-local
//! stack of render frames for exactly as long as its template renders.

use std::cell::RefCell;
use std::path::{Path, PathBuf};

use minijinja::{Environment, Error, ErrorKind, Value};
use switchyard_dispatch::{Bindings, RenderError, SubViews, TemplateRenderer};
use tracing::{debug, trace};

use crate::error::{from_engine_error, from_io_error};
use crate::filters::register_filters;

thread_local! {
    static FRAMES: RefCell<Vec<Frame>> = const { RefCell::new(Vec::new()) };
}

/// One template render in progress on this thread.
struct Frame {
    views: Option<SubViews>,
    failure: Option<RenderError>,
}

/// Pops its frame when the render ends, including by panic.
struct FrameGuard;

impl FrameGuard {
    fn push(views: Option<SubViews>) -> Self {
        FRAMES.with(|frames| {
            frames.borrow_mut().push(Frame {
                views,
                failure: None,
            })
        });
        FrameGuard
    }

    fn take_failure(&self) -> Option<RenderError> {
        FRAMES.with(|frames| {
            frames
                .borrow_mut()
                .last_mut()
                .and_then(|frame| frame.failure.take())
        })
    }
}

impl Drop for FrameGuard {
    fn drop(&mut self) {
        FRAMES.with(|frames| {
            frames.borrow_mut().pop();
        });
    }
}

/// The `view(key, default=none)` template function.
fn render_sub_view(key: String, default: Option<String>) -> Result<Value, Error> {
    let views = FRAMES
        .with(|frames| frames.borrow().last().and_then(|frame| frame.views.clone()))
        .ok_or_else(|| {
            Error::new(
                ErrorKind::InvalidOperation,
                "view() is only available while rendering a dispatched view",
            )
        })?;

    debug!(key = key.as_str(), "rendering sub-view");
    match views.render_view(&key, default.as_deref()) {
        Ok(output) => Ok(Value::from_safe_string(output)),
        Err(err) => {
            let message = format!("sub-view '{}' failed: {}", key, err);
            FRAMES.with(|frames| {
                if let Some(frame) = frames.borrow_mut().last_mut() {
                    frame
                        .failure
                        .get_or_insert_with(|| RenderError::sub_view(key, err));
                }
            });
            Err(Error::new(ErrorKind::InvalidOperation, message))
        }
    }
}

/// Renders view templates with MiniJinja.
///
/// Each view file is read when it is rendered, so edits show up on the next
/// request. Bindings become top-level template variables.
///
/// # Example
///
/// ```rust
/// use switchyard_dispatch::{Bindings, TemplateRenderer};
/// use switchyard_render::MiniJinjaRenderer;
///
/// let dir = tempfile::tempdir().unwrap();
/// let path = dir.path().join("hello.jinja");
/// std::fs::write(&path, "Hello, {{ name }}!").unwrap();
///
/// let mut bindings = Bindings::new();
/// bindings.insert("name", "World");
///
/// let output = MiniJinjaRenderer::new().render(&path, &bindings).unwrap();
/// assert_eq!(output, "Hello, World!");
/// ```
pub struct MiniJinjaRenderer {
    env: Environment<'static>,
    include_root: Option<PathBuf>,
}

impl MiniJinjaRenderer {
    /// Creates a renderer with the view filters and the `view` function
    /// registered.
    pub fn new() -> Self {
        let mut env = Environment::new();
        register_filters(&mut env);
        env.add_function("view", render_sub_view);
        Self {
            env,
            include_root: None,
        }
    }

    /// Lets templates `{% include %}` and `{% extends %}` files below `root`.
    ///
    /// Usually the configured views directory. Names are relative to `root`
    /// and carry their extension, e.g. `{% include "partials/nav.jinja" %}`.
    pub fn with_include_root(mut self, root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        self.env.set_loader(minijinja::path_loader(&root));
        self.include_root = Some(root);
        self
    }

    /// The directory includes are resolved against, if any.
    pub fn include_root(&self) -> Option<&Path> {
        self.include_root.as_deref()
    }

    /// Returns a reference to the underlying MiniJinja environment.
    pub fn environment(&self) -> &Environment<'static> {
        &self.env
    }

    /// Returns a mutable reference to the underlying MiniJinja environment.
    ///
    /// Use it to register application filters, functions, or globals.
    pub fn environment_mut(&mut self) -> &mut Environment<'static> {
        &mut self.env
    }
}

impl Default for MiniJinjaRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl MiniJinjaRenderer {
    fn render_framed(
        &self,
        path: &Path,
        bindings: &Bindings,
        views: Option<SubViews>,
    ) -> Result<String, RenderError> {
        let source = std::fs::read_to_string(path).map_err(|e| from_io_error(e, path))?;
        trace!(path = %path.display(), bytes = source.len(), "loaded view template");

        let name = path.to_string_lossy();
        let frame = FrameGuard::push(views);
        let result = self
            .env
            .render_named_str(&name, &source, Value::from_serialize(bindings));

        // A failed sub-view keeps its own error rather than the engine's.
        match (result, frame.take_failure()) {
            (_, Some(failure)) => Err(failure),
            (Ok(output), None) => Ok(output),
            (Err(err), None) => Err(from_engine_error(err, path)),
        }
    }
}

impl TemplateRenderer for MiniJinjaRenderer {
    fn render(&self, path: &Path, bindings: &Bindings) -> Result<String, RenderError> {
        self.render_framed(path, bindings, None)
    }

    fn render_with_views(
        &self,
        path: &Path,
        bindings: &Bindings,
        views: &SubViews,
    ) -> Result<String, RenderError> {
        self.render_framed(path, bindings, Some(views.clone()))
    }
}
