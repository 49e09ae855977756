//! Health, liveness, and readiness endpoint handlers.
//!
//! These handlers expose server health information for orchestrators and
//! operational monitoring. They are served beside the dispatch wildcard
//! and take precedence over a unit whose derived path collides with them.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::json;

use super::AppState;
use crate::network::HealthState;

/// Returns detailed health information as JSON.
///
/// Always returns 200 -- the `state` field in the response body indicates
/// whether the provider is actually serving. This lets monitoring tools
/// distinguish between "up but draining" and "down".
pub async fn health_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    let health = state.shutdown.health_state();
    let services = state.dispatch.len();
    let in_flight = state.shutdown.in_flight_count();
    let uptime_secs = state.start_time.elapsed().as_secs();

    Json(json!({
        "state": health.as_str(),
        "services": services,
        "in_flight": in_flight,
        "uptime_secs": uptime_secs,
    }))
}

/// Liveness probe -- always returns 200 OK.
///
/// Only checks whether the process is running and responsive; a failed
/// liveness probe triggers a restart, so it must not depend on the core
/// systems or the health state.
pub async fn liveness_handler() -> StatusCode {
    StatusCode::OK
}

/// Readiness probe -- returns 200 when serving, 503 otherwise.
///
/// Returns 503 during startup (before the listener accepts requests),
/// while draining, and after stop, so load balancers route no new traffic
/// to the provider.
pub async fn readiness_handler(State(state): State<AppState>) -> StatusCode {
    if state.shutdown.health_state() == HealthState::Serving {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::time::Instant;

    use async_trait::async_trait;

    use unitdock_core::traits::{ExecutionError, UnitExecutor};

    use super::*;
    use crate::discovery::{DispatchTable, UnitEntry};
    use crate::network::ShutdownController;

    struct NoopExecutor;

    #[async_trait]
    impl UnitExecutor for NoopExecutor {
        async fn execute(
            &self,
            _unit: &std::path::Path,
            input: serde_json::Value,
        ) -> Result<serde_json::Value, ExecutionError> {
            Ok(input)
        }
    }

    fn test_state() -> AppState {
        let table = DispatchTable::new(vec![UnitEntry {
            name: "echo".to_string(),
            path: "echo".to_string(),
            source: PathBuf::from("/units/echo.ipynb"),
        }]);
        AppState {
            dispatch: Arc::new(table),
            executor: Arc::new(NoopExecutor),
            shutdown: Arc::new(ShutdownController::new()),
            start_time: Instant::now(),
        }
    }

    #[tokio::test]
    async fn health_handler_returns_json_with_all_fields() {
        let state = test_state();
        state.shutdown.set_serving();

        let response = health_handler(State(state)).await;
        let json = response.0;

        assert_eq!(json["state"], "serving");
        assert_eq!(json["services"], 1);
        assert_eq!(json["in_flight"], 0);
        assert!(json["uptime_secs"].is_number());
    }

    #[tokio::test]
    async fn health_handler_reports_starting_state() {
        let state = test_state();
        let response = health_handler(State(state)).await;
        assert_eq!(response.0["state"], "starting");
    }

    #[tokio::test]
    async fn health_handler_reports_draining_state() {
        let state = test_state();
        state.shutdown.set_serving();
        state.shutdown.trigger_shutdown();

        let response = health_handler(State(state)).await;
        assert_eq!(response.0["state"], "draining");
    }

    #[tokio::test]
    async fn health_handler_reports_in_flight_count() {
        let state = test_state();
        let _guard = state.shutdown.in_flight_guard();

        let response = health_handler(State(state)).await;
        assert_eq!(response.0["in_flight"], 1);
    }

    #[tokio::test]
    async fn liveness_handler_always_returns_200() {
        let status = liveness_handler().await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn readiness_handler_returns_200_when_serving() {
        let state = test_state();
        state.shutdown.set_serving();

        let status = readiness_handler(State(state)).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn readiness_handler_returns_503_when_starting() {
        let state = test_state();
        let status = readiness_handler(State(state)).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn readiness_handler_returns_503_when_draining() {
        let state = test_state();
        state.shutdown.set_serving();
        state.shutdown.trigger_shutdown();

        let status = readiness_handler(State(state)).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }
}
