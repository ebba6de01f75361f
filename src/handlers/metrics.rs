//! Prometheus metrics endpoint
//!
//! Exposes agent metrics in Prometheus text format for scraping.

use axum::{
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};

use crate::handlers::AppState;

/// Metrics handler for Prometheus scraping
///
/// # Response
///
/// - `200 OK` with metrics in Prometheus text format
/// - `500 Internal Server Error` if metrics encoding fails
///
/// # Example
///
/// ```bash
/// curl http://localhost:5000/metrics
/// # HELP agent_success_total Total successful agent requests
/// # TYPE agent_success_total counter
/// agent_success_total 42
/// ```
pub async fn handler(State(state): State<AppState>) -> Response {
    match state.metrics().gather() {
        Ok(output) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)],
            output,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to gather metrics for Prometheus scraping");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to gather metrics: {}", e),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::sync::Arc;

    fn create_test_state() -> AppState {
        let config: Config = "[server]\n".parse().expect("should parse test config");
        AppState::new(Arc::new(config))
    }

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_metrics_handler_returns_prometheus_format() {
        let state = create_test_state();
        state.metrics().record_success(0.2).unwrap();

        let response = handler(State(state)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            prometheus::TEXT_FORMAT
        );

        let body = body_string(response).await;
        assert!(body.contains("# HELP"));
        assert!(body.contains("# TYPE"));
        assert!(body.contains("agent_success_total 1\n"));
    }

    #[tokio::test]
    async fn test_concurrent_metrics_scraping() {
        let state = create_test_state();
        state.metrics().record_error(1.0).unwrap();

        let mut handles = vec![];
        for _ in 0..10 {
            let state = state.clone();
            handles.push(tokio::spawn(async move { handler(State(state)).await }));
        }

        let mut bodies = vec![];
        for handle in handles {
            let response = handle.await.expect("scrape task should not panic");
            assert_eq!(response.status(), StatusCode::OK);
            bodies.push(body_string(response).await);
        }

        assert!(bodies.windows(2).all(|pair| pair[0] == pair[1]));
    }
}
