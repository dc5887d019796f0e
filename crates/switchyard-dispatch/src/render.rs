//! Template renderer abstraction.
//!
//! Defines the contract between dispatch and template engines.
//! Dispatch doesn't know about template languages - it resolves a template
//! path and a flat table of bindings, and asks a [`TemplateRenderer`] to turn
//! them into output.
//!
//! A template may itself render further views by key (a sidebar, a footer).
//! Engines that support this receive a [`ViewScope`] through
//! [`TemplateRenderer::render_with_views`] and call back into it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde::Serialize;
use serde_json::Value;

use crate::error::DispatchError;

/// Flat key/value bindings made visible to a template.
///
/// Built from a context snapshot; every entry becomes a top-level variable.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Bindings(HashMap<String, Value>);

impl Bindings {
    /// Creates empty bindings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `key`, replacing a previous binding.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Returns the value bound to `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Iterates over all bindings in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Number of bindings.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if nothing is bound.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Converts the bindings into a JSON object.
    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone().into_iter().collect())
    }
}

impl From<&HashMap<String, Value>> for Bindings {
    fn from(snapshot: &HashMap<String, Value>) -> Self {
        Bindings(snapshot.clone())
    }
}

impl FromIterator<(String, Value)> for Bindings {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Bindings(iter.into_iter().collect())
    }
}

/// Errors that can occur during rendering.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// The template resource does not exist
    #[error("template not found: {}", .0.display())]
    TemplateNotFound(PathBuf),

    /// The template could not be read
    #[error("failed to read template '{}': {source}", path.display())]
    Io {
        /// Path that failed to read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Template compilation or evaluation failed
    #[error("render error: {0}")]
    Render(String),

    /// A sub-view rendered from inside the template failed
    #[error("sub-view '{key}' failed: {source}")]
    SubView {
        /// View key the template asked for
        key: String,
        /// The dispatch failure of the sub-view
        #[source]
        source: Box<DispatchError>,
    },
}

impl RenderError {
    /// Wraps the failure of the sub-view registered under `key`.
    pub fn sub_view(key: impl Into<String>, source: DispatchError) -> Self {
        RenderError::SubView {
            key: key.into(),
            source: Box::new(source),
        }
    }
}

/// Renders views by key on behalf of a template.
///
/// Keys resolve against the state whose view is being rendered: the
/// controller's, or the component's when one produced the bindings.
pub trait ViewScope {
    /// Renders the view registered under `key`, or `default` when the key is
    /// not set.
    fn render_view(&self, key: &str, default: Option<&str>) -> Result<String, DispatchError>;
}

/// Shared handle to a [`ViewScope`], valid for the duration of one render.
pub type SubViews = Rc<dyn ViewScope>;

/// Turns a template resource and its bindings into output.
pub trait TemplateRenderer {
    /// Renders the template at `path` with `bindings` as its variables.
    ///
    /// Must fail with [`RenderError::TemplateNotFound`] when `path` does not
    /// exist.
    fn render(&self, path: &Path, bindings: &Bindings) -> Result<String, RenderError>;

    /// Renders with access to sub-views. This is what the view resolver calls.
    ///
    /// Engines that cannot call back into dispatch keep the default, which
    /// ignores `views`.
    fn render_with_views(
        &self,
        path: &Path,
        bindings: &Bindings,
        views: &SubViews,
    ) -> Result<String, RenderError> {
        let _ = views;
        self.render(path, bindings)
    }
}

impl<T: TemplateRenderer + ?Sized> TemplateRenderer for &T {
    fn render(&self, path: &Path, bindings: &Bindings) -> Result<String, RenderError> {
        (**self).render(path, bindings)
    }

    fn render_with_views(
        &self,
        path: &Path,
        bindings: &Bindings,
        views: &SubViews,
    ) -> Result<String, RenderError> {
        (**self).render_with_views(path, bindings, views)
    }
}

/// A renderer backed by a closure.
pub struct FnRenderer<F> {
    f: F,
}

impl<F> TemplateRenderer for FnRenderer<F>
where
    F: Fn(&Path, &Bindings) -> Result<String, RenderError>,
{
    fn render(&self, path: &Path, bindings: &Bindings) -> Result<String, RenderError> {
        (self.f)(path, bindings)
    }
}

/// Creates a renderer from a closure.
///
/// This is the primary way to plug in a custom engine, or a stub in tests.
pub fn from_fn<F>(f: F) -> FnRenderer<F>
where
    F: Fn(&Path, &Bindings) -> Result<String, RenderError>,
{
    FnRenderer { f }
}

/// Creates a renderer that outputs the bindings as pretty JSON.
///
/// The path must still exist; useful for debugging view wiring.
pub fn json_render() -> impl TemplateRenderer {
    from_fn(|path, bindings| {
        if !path.exists() {
            return Err(RenderError::TemplateNotFound(path.to_path_buf()));
        }
        serde_json::to_string_pretty(bindings).map_err(|e| RenderError::Render(e.to_string()))
    })
}
