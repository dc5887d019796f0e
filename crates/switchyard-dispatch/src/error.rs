//! Error types for the dispatch pipeline.
//!
//! Every failure raised while dispatching a request is a [`DispatchError`].
//! The pipeline never recovers locally: the first error unwinds the whole
//! dispatch and is handed to the caller, which translates it into a response
//! (see [`DispatchError::status_code`]).

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::hooks::FilterError;
use crate::render::RenderError;

/// Boxed error from user code (actions, components).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Which keyed store a lookup missed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyScope {
    /// The per-controller context store
    Context,
    /// The per-controller view registry
    View,
}

impl fmt::Display for KeyScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyScope::Context => write!(f, "context"),
            KeyScope::View => write!(f, "view"),
        }
    }
}

/// Coarse classification of a [`DispatchError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Context or view lookup miss
    KeyNotFound,
    /// Malformed wiring between dispatcher and collaborators
    Configuration,
    /// Unknown controller or method
    NotFound,
    /// Resolved view has no template resource
    TemplateNotFound,
    /// An action, component, or filter failed
    Handler,
    /// The template engine failed
    Render,
}

/// Errors raised while dispatching a request.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A context or view-registry key was not present.
    #[error("{scope} key '{key}' not found")]
    KeyNotFound {
        /// The store that was queried
        scope: KeyScope,
        /// The missing key
        key: String,
    },

    /// The dispatcher or its collaborators are wired incorrectly.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The requested controller or method does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The resolved view identifier has no backing template.
    #[error("template not found: {}", .0.display())]
    TemplateNotFound(PathBuf),

    /// A controller action returned an error.
    #[error("action '{method}' on controller '{controller}' failed")]
    Action {
        /// Controller identifier
        controller: String,
        /// Method that was invoked (the catch-all reports the requested name)
        method: String,
        /// Error returned by the action
        #[source]
        source: BoxError,
    },

    /// A view component's handler returned an error.
    #[error("component '{view}' failed")]
    Component {
        /// View identifier the component is registered under
        view: String,
        /// Error returned by the component
        #[source]
        source: BoxError,
    },

    /// A filter returned an error.
    #[error(transparent)]
    Filter(#[from] FilterError),

    /// The template engine failed for a reason other than a missing template.
    #[error("render error: {0}")]
    Render(String),
}

impl DispatchError {
    pub(crate) fn context_key(key: impl Into<String>) -> Self {
        DispatchError::KeyNotFound {
            scope: KeyScope::Context,
            key: key.into(),
        }
    }

    pub(crate) fn view_key(key: impl Into<String>) -> Self {
        DispatchError::KeyNotFound {
            scope: KeyScope::View,
            key: key.into(),
        }
    }

    /// Returns the coarse kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DispatchError::KeyNotFound { .. } => ErrorKind::KeyNotFound,
            DispatchError::Configuration(_) => ErrorKind::Configuration,
            DispatchError::NotFound(_) => ErrorKind::NotFound,
            DispatchError::TemplateNotFound(_) => ErrorKind::TemplateNotFound,
            DispatchError::Action { .. }
            | DispatchError::Component { .. }
            | DispatchError::Filter(_) => ErrorKind::Handler,
            DispatchError::Render(_) => ErrorKind::Render,
        }
    }

    /// HTTP status a boundary should answer with.
    ///
    /// Only [`ErrorKind::NotFound`] is a client error; everything else is an
    /// internal server error.
    pub fn status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::NotFound => 404,
            _ => 500,
        }
    }
}

impl From<RenderError> for DispatchError {
    fn from(err: RenderError) -> Self {
        match err {
            RenderError::TemplateNotFound(path) => DispatchError::TemplateNotFound(path),
            RenderError::SubView { source, .. } => *source,
            other => DispatchError::Render(other.to_string()),
        }
    }
}
