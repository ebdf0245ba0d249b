#![allow(dead_code)]

use serde_json::{Value, json};
use taskdeck_core::{App, BackendConfig, HttpBackend};
use wiremock::MockServer;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

pub fn record(id: u64, title: &str, priority: &str, completed: bool, created_at: &str) -> Value {
    json!({
        "id": id,
        "title": title,
        "description": "",
        "priority": priority,
        "category": "general",
        "deadline": "",
        "completed": completed,
        "created_at": created_at
    })
}

/// The two-task store used across scenarios: an open low-priority task and
/// a newer completed high-priority one.
pub fn scenario_records() -> Value {
    json!([
        record(1, "A", "low", false, "2025-01-01T09:00:00.000000"),
        record(2, "B", "high", true, "2025-01-02T09:00:00.000000"),
    ])
}

pub fn app_for(server: &MockServer) -> App<HttpBackend> {
    let backend = HttpBackend::new(BackendConfig {
        base_url: server.uri(),
        ..BackendConfig::default()
    })
    .expect("backend client");
    App::new(backend)
}

pub async fn mount_list(server: &MockServer, body: Value) {
    Mock::given(method("GET"))
        .and(path("/api/tasks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// An app whose store has been loaded from `body`.
pub async fn loaded_app(server: &MockServer, body: Value) -> App<HttpBackend> {
    mount_list(server, body).await;
    let mut app = app_for(server);
    app.refresh().await.expect("initial load");
    app
}
