//! MiniJinja filter registration.

use minijinja::{Environment, Error, ErrorKind, Value};

/// Registers the view filters on a MiniJinja environment.
///
/// Called by [`MiniJinjaRenderer::new`](crate::MiniJinjaRenderer::new).
pub fn register_filters(env: &mut Environment<'static>) {
    // Usage: {{ content | nl }} outputs content followed by \n
    env.add_filter("nl", |value: Value| -> String { format!("{}\n", value) });

    // Usage: <script>const user = {{ user | json }};</script>
    env.add_filter("json", |value: Value| -> Result<String, Error> {
        serde_json::to_string(&value)
            .map_err(|e| Error::new(ErrorKind::BadSerialization, e.to_string()))
    });
}
