//! End-to-end tests: requests dispatched to controllers and rendered from
//! view files on disk with MiniJinja.

use std::fs;
use std::path::Path;

use switchyard_dispatch::{
    Action, ActionResult, Component, Controller, ControllerState, DispatchError, Dispatcher,
    DispatcherBuilder, FilterRegistry, FilterVerdict, InstanceRegistry, Outcome, RequestMatch,
    Settings,
};
use switchyard_render::MiniJinjaRenderer;
use tempfile::TempDir;

#[derive(Default)]
struct Users {
    state: ControllerState,
}

impl Users {
    fn index(&mut self, _matches: &RequestMatch) -> ActionResult {
        self.state
            .set("users", serde_json::json!(["ada", "grace", "linus"]));
        Ok(Outcome::view("users/list"))
    }

    fn show(&mut self, matches: &RequestMatch) -> ActionResult {
        self.state.set("name", "ada");
        self.state.set("id", matches.segment(2).unwrap_or("1"));
        Ok(Outcome::view("profile"))
    }

    fn broken(&mut self, _matches: &RequestMatch) -> ActionResult {
        Ok(Outcome::view("broken"))
    }

    fn ghost(&mut self, _matches: &RequestMatch) -> ActionResult {
        Ok(Outcome::view("ghost"))
    }

    fn dashboard(&mut self, matches: &RequestMatch) -> ActionResult {
        self.state.set("name", "ada");
        if let Some(sidebar) = matches.segment(2) {
            self.state.set_view("sidebar", sidebar);
        }
        Ok(Outcome::view("dashboard"))
    }
}

impl Controller for Users {
    fn state(&self) -> &ControllerState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ControllerState {
        &mut self.state
    }

    fn action(&self, method: &str) -> Option<Action<Self>> {
        match method {
            "index" => Some(Users::index),
            "show" => Some(Users::show),
            "broken" => Some(Users::broken),
            "ghost" => Some(Users::ghost),
            "dashboard" => Some(Users::dashboard),
            _ => None,
        }
    }
}

#[derive(Default)]
struct ProfileCard {
    state: ControllerState,
}

impl Component for ProfileCard {
    fn state(&self) -> &ControllerState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ControllerState {
        &mut self.state
    }

    fn handle(&mut self) -> Result<(), anyhow::Error> {
        let name = self.state.get("name")?.as_str().unwrap_or_default().to_string();
        self.state.set("greeting", format!("Hello, {}", name));
        Ok(())
    }
}

fn write(root: &Path, name: &str, content: &str) {
    let path = root.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn views() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "users/list.jinja",
        "{% for user in users %}<li>{{ user }}</li>{% endfor %}",
    );
    write(
        dir.path(),
        "profile.jinja",
        "{% include \"partials/nav.jinja\" %}{{ greeting }} (#{{ id }})",
    );
    write(dir.path(), "partials/nav.jinja", "[{{ site }}] ");
    write(dir.path(), "broken.jinja", "{% if %}");
    write(
        dir.path(),
        "dashboard.jinja",
        "<main>{{ view(\"sidebar\") }}|{{ view(\"footer\", \"partials/footer\") }}</main>",
    );
    write(dir.path(), "nav.jinja", "<nav>{{ base_url }}/users</nav>");
    write(dir.path(), "partials/footer.jinja", "<footer>{{ site }}</footer>");
    dir
}

fn dispatcher(dir: &TempDir, with_component: bool) -> Dispatcher<MiniJinjaRenderer> {
    let mut locator = InstanceRegistry::new().controller("users", Users::default);
    if with_component {
        locator = locator.component("profile", ProfileCard::default);
    }
    let filters = FilterRegistry::new().pre_controller(|target| {
        target.state.set("site", "Switchyard");
        Ok(FilterVerdict::Continue)
    });

    DispatcherBuilder::new()
        .locator(locator)
        .filters(filters)
        .config(Settings::new(dir.path().to_string_lossy(), "users"))
        .build(MiniJinjaRenderer::new().with_include_root(dir.path()))
        .unwrap()
}

#[test]
fn test_default_controller_renders_list() {
    let dir = views();
    let out = dispatcher(&dir, false)
        .handle_request(&RequestMatch::new("/"))
        .unwrap();
    assert_eq!(out, "<li>ada</li><li>grace</li><li>linus</li>");
}

#[test]
fn test_component_bindings_and_include() {
    let dir = views();
    let out = dispatcher(&dir, true)
        .handle_request(&RequestMatch::new("/app/").with_path("users/show/7"))
        .unwrap();
    assert_eq!(out, "[Switchyard] Hello, ada (#7)");
}

#[test]
fn test_controller_context_without_component() {
    let dir = views();
    let out = dispatcher(&dir, false)
        .handle_request(&RequestMatch::new("/").with_path("users/show"))
        .unwrap();
    // No component ran, so greeting is undefined and renders empty.
    assert_eq!(out, "[Switchyard]  (#1)");
}

#[test]
fn test_missing_view_file() {
    let dir = views();
    let err = dispatcher(&dir, false)
        .handle_request(&RequestMatch::new("/").with_path("users/ghost"))
        .unwrap_err();
    assert!(
        matches!(err, DispatchError::TemplateNotFound(ref path) if path.ends_with("ghost.jinja"))
    );
    assert_eq!(err.status_code(), 500);
}

#[test]
fn test_template_syntax_error() {
    let dir = views();
    let err = dispatcher(&dir, false)
        .handle_request(&RequestMatch::new("/").with_path("users/broken"))
        .unwrap_err();
    assert!(matches!(err, DispatchError::Render(_)));
}

#[test]
fn test_view_extension_setting() {
    let dir = views();
    write(dir.path(), "users/list.html", "<p>{{ users | length }} users</p>");

    let dispatcher = DispatcherBuilder::new()
        .locator(InstanceRegistry::new().controller("users", Users::default))
        .config(Settings::new(dir.path().to_string_lossy(), "users").with_view_extension("html"))
        .build(MiniJinjaRenderer::new())
        .unwrap();

    let out = dispatcher
        .handle_request(&RequestMatch::new("/").with_path("users"))
        .unwrap();
    assert_eq!(out, "<p>3 users</p>");
}

#[test]
fn test_sub_views_by_key_and_default() {
    let dir = views();
    let out = dispatcher(&dir, false)
        .handle_request(&RequestMatch::new("/app/").with_path("users/dashboard/nav"))
        .unwrap();
    assert_eq!(
        out,
        "<main><nav>/app/users</nav>|<footer>Switchyard</footer></main>"
    );
}

#[test]
fn test_sub_view_runs_component() {
    let dir = views();
    let out = dispatcher(&dir, true)
        .handle_request(&RequestMatch::new("/").with_path("users/dashboard/profile"))
        .unwrap();
    assert_eq!(
        out,
        "<main>[Switchyard] Hello, ada (#)|<footer>Switchyard</footer></main>"
    );
}

#[test]
fn test_unset_sub_view_without_default() {
    let dir = views();
    let err = dispatcher(&dir, false)
        .handle_request(&RequestMatch::new("/").with_path("users/dashboard"))
        .unwrap_err();
    assert!(matches!(err, DispatchError::Configuration(ref m) if m.contains("sidebar")));
}

#[test]
fn test_sub_view_missing_file() {
    let dir = views();
    let err = dispatcher(&dir, false)
        .handle_request(&RequestMatch::new("/").with_path("users/dashboard/ghost"))
        .unwrap_err();
    assert!(
        matches!(err, DispatchError::TemplateNotFound(ref path) if path.ends_with("ghost.jinja"))
    );
}
