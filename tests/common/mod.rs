//! Shared helpers for HTTP-level tests
//!
//! Agents are stood in for by `sh -c <script>`; the instruction arrives in
//! the script as `$0`.

#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, Response},
};
use std::sync::Arc;
use taskmaster::{
    config::{AgentConfig, Config},
    handlers::{self, AppState},
};
use tower::ServiceExt;

/// Agent configuration running `script` under `sh -c`
pub fn sh_agent(script: &str) -> AgentConfig {
    AgentConfig::new(
        "sh",
        vec!["-c".to_string(), script.to_string()],
        std::env::temp_dir(),
    )
}

/// Application state using the given agent
pub fn state_with_agent(agent: AgentConfig) -> AppState {
    let mut config: Config = "[server]\nhost = \"127.0.0.1\"\nport = 5000\n"
        .parse()
        .expect("should parse test config");
    config.agent = agent;
    AppState::new(Arc::new(config))
}

/// Full router plus a handle on its state for inspecting metrics
pub fn app_with_agent(agent: AgentConfig) -> (Router, AppState) {
    let state = state_with_agent(agent);
    (handlers::app(state.clone()), state)
}

pub fn task_request(body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/task")
        .header("content-type", "application/json")
        .body(body.into())
        .unwrap()
}

pub fn metrics_request() -> Request<Body> {
    Request::builder()
        .uri("/metrics")
        .body(Body::empty())
        .unwrap()
}

pub async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.unwrap()
}

pub async fn body_string(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).expect("body should be UTF-8")
}

/// Value of the metrics line starting with `name` followed by a space
pub fn metric_value(metrics: &str, name: &str) -> f64 {
    metrics
        .lines()
        .find_map(|line| line.strip_prefix(name)?.strip_prefix(' '))
        .unwrap_or_else(|| panic!("metric {name} missing from:\n{metrics}"))
        .parse()
        .expect("metric value should be numeric")
}
