//! MiniJinja view rendering for switchyard dispatch.
//!
//! `switchyard-render` provides [`MiniJinjaRenderer`], a
//! [`TemplateRenderer`](switchyard_dispatch::TemplateRenderer) that renders
//! the view files the dispatcher resolves (`<viewsDirectory>/<view>.<ext>`)
//! with the controller's context as template variables.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use switchyard_dispatch::{DispatcherBuilder, InstanceRegistry, RequestMatch, Settings};
//! use switchyard_render::MiniJinjaRenderer;
//!
//! let dispatcher = DispatcherBuilder::new()
//!     .locator(InstanceRegistry::new().controller("users", Users::default))
//!     .config(Settings::new("views", "users"))
//!     .build(MiniJinjaRenderer::new().with_include_root("views"))?;
//!
//! let html = dispatcher.handle_request(&RequestMatch::new("/").with_path("users/show"))?;
//! ```
//!
//! ## Filters
//!
//! Besides MiniJinja's built-ins, views can use:
//!
//! - `nl`: appends a newline
//! - `json`: serializes a value as compact JSON
//!
//! ## Sub-views
//!
//! `view(key, default=none)` renders the view registered under `key` on the
//! current controller (or component), falling back to the `default` view id.
//! Every view also sees the request's `base_url`.

mod engine;
pub mod error;
pub mod filters;

pub use engine::MiniJinjaRenderer;
pub use filters::register_filters;
