//! Conversion of template engine errors.
//!
//! The dispatcher only understands [`RenderError`]. This module keeps
//! MiniJinja's error kinds out of its API, the same way the engine's own
//! errors never leave this crate.

use std::path::Path;

use minijinja::ErrorKind;
use switchyard_dispatch::RenderError;

/// Converts a MiniJinja error raised while rendering the view at `path`.
///
/// A missing top-level template never reaches the engine (it fails when the
/// file is read), so a `TemplateNotFound` here is a missing include and is
/// reported as a render failure of the including view.
pub fn from_engine_error(err: minijinja::Error, path: &Path) -> RenderError {
    let detail = match err.kind() {
        ErrorKind::TemplateNotFound => format!("missing include in {}: {}", path.display(), err),
        ErrorKind::SyntaxError
        | ErrorKind::BadEscape
        | ErrorKind::UndefinedError
        | ErrorKind::UnknownTest
        | ErrorKind::UnknownFunction
        | ErrorKind::UnknownFilter
        | ErrorKind::UnknownMethod => format!("template error in {}: {}", path.display(), err),
        ErrorKind::BadSerialization => {
            format!("unserializable binding in {}: {}", path.display(), err)
        }
        _ => format!("{}: {}", path.display(), err),
    };
    RenderError::Render(detail)
}

/// Converts an I/O error raised while reading the view at `path`.
pub fn from_io_error(err: std::io::Error, path: &Path) -> RenderError {
    match err.kind() {
        std::io::ErrorKind::NotFound => RenderError::TemplateNotFound(path.to_path_buf()),
        _ => RenderError::Io {
            path: path.to_path_buf(),
            source: err,
        },
    }
}
