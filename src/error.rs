//! Error types for TaskMaster
//!
//! All errors implement `IntoResponse` for Axum handlers and render the
//! `{"error": "<message>"}` envelope.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Main error type for the application
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to read config file {path}: {source}")]
    ConfigFileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    ConfigParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration in {path}: {reason}")]
    ConfigValidationFailed { path: String, reason: String },

    /// Request body could not be interpreted as a task request
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    /// Agent ran to completion but exited with a nonzero status
    #[error("Agent failed ({}): {stderr}", exit_label(.exit_code))]
    AgentFailed {
        exit_code: Option<i32>,
        stderr: String,
    },

    /// Agent process could not be started
    #[error("Failed to start agent '{program}': {source}")]
    AgentSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Agent did not finish within {timeout_seconds} seconds")]
    AgentTimeout { timeout_seconds: u64 },

    #[error("Internal error: {0}")]
    Internal(String),
}

fn exit_label(exit_code: &Option<i32>) -> String {
    match exit_code {
        Some(code) => format!("exit code {code}"),
        None => "terminated by signal".to_string(),
    }
}

impl AppError {
    /// Message placed in the `error` field of the response envelope
    ///
    /// Agent failures surface the agent's own stderr text untouched so that
    /// clients see exactly what the agent reported.
    pub fn client_message(&self) -> String {
        match self {
            Self::MalformedRequest(msg) => msg.clone(),
            Self::AgentFailed { stderr, .. } => stderr.clone(),
            Self::AgentSpawn { source, .. } => source.to_string(),
            Self::Config(msg) => msg.clone(),
            Self::Internal(msg) => msg.clone(),
            _ => self.to_string(),
        }
    }

    /// HTTP status for this error
    pub fn status(&self) -> StatusCode {
        match self {
            Self::AgentTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({
            "error": self.client_message(),
        }));

        (self.status(), body).into_response()
    }
}

/// Convenience type alias for Results
pub type AppResult<T> = Result<T, AppError>;
