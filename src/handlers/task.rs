//! Task endpoint handler
//!
//! Handles POST /task: runs the external agent with the request's
//! instruction and passes its output straight through.

use crate::error::{AppError, AppResult};
use crate::handlers::AppState;
use crate::middleware::RequestId;
use axum::{
    Extension,
    body::{Body, to_bytes},
    extract::{Request, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::Value;
use std::time::Instant;

/// Task request from client
///
/// Only `instruction` is read. A missing or `null` instruction becomes the
/// empty string and is still sent to the agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRequest {
    instruction: String,
}

impl TaskRequest {
    pub fn new(instruction: impl Into<String>) -> Self {
        Self {
            instruction: instruction.into(),
        }
    }

    /// Get the instruction
    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    /// Parse a raw request body
    ///
    /// # Errors
    ///
    /// `AppError::MalformedRequest` if the body is not JSON, is not a JSON
    /// object, or carries a non-string `instruction`.
    pub fn from_slice(body: &[u8]) -> AppResult<Self> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| AppError::MalformedRequest(e.to_string()))?;

        let Value::Object(mut fields) = value else {
            return Err(AppError::MalformedRequest(
                "request body must be a JSON object".to_string(),
            ));
        };

        let instruction = match fields.remove("instruction") {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(instruction)) => instruction,
            Some(other) => {
                return Err(AppError::MalformedRequest(format!(
                    "instruction must be a string, got {}",
                    json_kind(&other)
                )));
            }
        };

        Ok(Self { instruction })
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Upper bound on a buffered task body
pub const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// POST /task handler
///
/// - `200 OK` with the agent's stdout as an `application/json` body when the
///   agent exits 0
/// - `500` with `{"error": "<message>"}` for malformed or oversized requests,
///   agents that cannot start, and nonzero exits
/// - `504` with the same envelope when a configured timeout expires
///
/// Every call records exactly one outcome and one latency sample, even if
/// the client goes away before the agent exits.
pub async fn handler(
    State(state): State<AppState>,
    request_id: Option<Extension<RequestId>>,
    request: Request,
) -> Response {
    let start = Instant::now();
    let request_id = request_id.map(|Extension(id)| id).unwrap_or_default();
    let body = request.into_body();

    // Detached from the connection: a disconnect must not cancel the agent
    // or drop its outcome.
    let task = tokio::spawn(async move {
        let outcome = run(&state, body).await;
        let elapsed = start.elapsed().as_secs_f64();
        complete(&state, request_id, elapsed, outcome)
    });

    match task.await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(
                request_id = %request_id,
                error = %e,
                "Task worker did not complete"
            );
            AppError::Internal(format!("task worker failed: {e}")).into_response()
        }
    }
}

/// Read, parse, invoke and classify; the agent's stdout on success
async fn run(state: &AppState, body: Body) -> AppResult<String> {
    let body = to_bytes(body, MAX_BODY_BYTES).await.map_err(|e| {
        AppError::MalformedRequest(format!("failed to read request body: {e}"))
    })?;
    let request = TaskRequest::from_slice(&body)?;
    let result = state.invoker().invoke(request.instruction()).await?;
    result.into_output()
}

/// Record the outcome and build the response
fn complete(
    state: &AppState,
    request_id: RequestId,
    elapsed: f64,
    outcome: AppResult<String>,
) -> Response {
    match outcome {
        Ok(output) => {
            if let Err(e) = state.metrics().record_success(elapsed) {
                tracing::error!(
                    request_id = %request_id,
                    error = %e,
                    "Failed to record task success metric"
                );
            }

            tracing::info!(
                request_id = %request_id,
                elapsed_ms = elapsed * 1000.0,
                response_bytes = output.len(),
                "Task completed"
            );

            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "application/json")],
                output,
            )
                .into_response()
        }
        Err(err) => {
            if let Err(e) = state.metrics().record_error(elapsed) {
                tracing::error!(
                    request_id = %request_id,
                    error = %e,
                    "Failed to record task error metric"
                );
            }

            tracing::warn!(
                request_id = %request_id,
                elapsed_ms = elapsed * 1000.0,
                error = %err,
                "Task failed"
            );

            err.into_response()
        }
    }
}
