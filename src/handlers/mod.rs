//! HTTP request handlers for the TaskMaster API

use crate::agent::AgentInvoker;
use crate::config::Config;
use crate::metrics::AgentMetrics;
use crate::middleware::request_id_middleware;
use axum::{
    Router, middleware,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub mod health;
pub mod metrics;
pub mod task;

/// Application state shared across all handlers
///
/// All fields are Arc'd (or internally shared) for cheap cloning across
/// Axum handlers.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    invoker: AgentInvoker,
    metrics: AgentMetrics,
}

impl AppState {
    /// Create a new AppState from configuration
    pub fn new(config: Arc<Config>) -> Self {
        let invoker = AgentInvoker::new(config.agent.clone());

        Self {
            config,
            invoker,
            metrics: AgentMetrics::new(),
        }
    }

    /// Get reference to the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get reference to the agent invoker
    pub fn invoker(&self) -> &AgentInvoker {
        &self.invoker
    }

    /// Get reference to the metrics accumulator
    pub fn metrics(&self) -> &AgentMetrics {
        &self.metrics
    }
}

/// Build the application router with all routes and middleware
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/task", post(task::handler))
        .route("/metrics", get(metrics::handler))
        .route("/health", get(health::handler))
        .with_state(state)
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
}
