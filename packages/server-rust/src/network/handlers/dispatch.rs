//! The generic dispatch handler behind `POST /{*path}`.
//!
//! Every discovered unit is served by this one handler: the wildcard path
//! is looked up in the immutable dispatch table, the request body decoded,
//! and the unit executor invoked with the unit's real source path.
//! Executor failures are logged in full but answered with an opaque body
//! so unit internals never leak to a consumer.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use serde_json::{json, Value};
use tracing::{debug, error};

use super::AppState;
use crate::network::HealthState;

pub async fn dispatch_handler(
    State(state): State<AppState>,
    Path(path): Path<String>,
    body: Bytes,
) -> Response {
    if state.shutdown.health_state() != HealthState::Serving {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": "server is draining" })),
        )
            .into_response();
    }
    let _guard = state.shutdown.in_flight_guard();

    // Path resolution comes first: an unknown path is 404 regardless of
    // what the body contains, and the executor is never invoked.
    let Some(unit) = state.dispatch.lookup(&path) else {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "unknown service path" })),
        )
            .into_response();
    };

    let payload: Value = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(error) => {
            debug!(service = %path, %error, "rejecting undecodable request body");
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "request body is not valid JSON" })),
            )
                .into_response();
        }
    };

    debug!(service = %path, unit = %unit.source.display(), "dispatching request");
    match state.executor.execute(&unit.source, payload).await {
        Ok(output) => (StatusCode::OK, Json(output)).into_response(),
        Err(err) => {
            // Full detail stays in the server log; the consumer gets an
            // opaque body.
            error!(service = %path, unit = %unit.source.display(), error = %err, "unit execution failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "unit execution failed" })),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::time::Instant;

    use async_trait::async_trait;
    use serde_json::json;

    use unitdock_core::traits::{ExecutionError, UnitExecutor};

    use super::*;
    use crate::discovery::{DispatchTable, UnitEntry};
    use crate::network::ShutdownController;

    /// Executor that echoes its input back, recording the unit path it saw.
    struct EchoExecutor {
        seen: std::sync::Mutex<Vec<PathBuf>>,
        fail: bool,
    }

    impl EchoExecutor {
        fn new(fail: bool) -> Self {
            Self {
                seen: std::sync::Mutex::new(Vec::new()),
                fail,
            }
        }
    }

    #[async_trait]
    impl UnitExecutor for EchoExecutor {
        async fn execute(
            &self,
            unit: &std::path::Path,
            input: serde_json::Value,
        ) -> Result<serde_json::Value, ExecutionError> {
            self.seen.lock().unwrap().push(unit.to_path_buf());
            if self.fail {
                return Err(ExecutionError::Timeout { timeout_secs: 1 });
            }
            Ok(input)
        }
    }

    fn entry(name: &str, path: &str, source: &str) -> UnitEntry {
        UnitEntry {
            name: name.to_string(),
            path: path.to_string(),
            source: PathBuf::from(source),
        }
    }

    fn state_with(executor: Arc<EchoExecutor>) -> AppState {
        let table = DispatchTable::new(vec![
            entry("echo", "echo", "/units/echo.ipynb"),
            entry(
                "read-meter",
                "machine-vision/read-meter",
                "/units/machine vision/read_meter.ipynb",
            ),
        ]);
        let state = AppState {
            dispatch: Arc::new(table),
            executor,
            shutdown: Arc::new(ShutdownController::new()),
            start_time: Instant::now(),
        };
        state.shutdown.set_serving();
        state
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[tokio::test]
    async fn known_path_executes_the_unit_source() {
        let executor = Arc::new(EchoExecutor::new(false));
        let state = state_with(Arc::clone(&executor));
        let input = json!({"value": 42});

        let response = dispatch_handler(
            State(state),
            Path("machine-vision/read-meter".to_string()),
            Bytes::from(input.to_string()),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, input);
        // The executor received the real source path, not the service path.
        assert_eq!(
            executor.seen.lock().unwrap().as_slice(),
            [PathBuf::from("/units/machine vision/read_meter.ipynb")]
        );
    }

    #[tokio::test]
    async fn unknown_path_is_404_and_executor_untouched() {
        let executor = Arc::new(EchoExecutor::new(false));
        let state = state_with(Arc::clone(&executor));

        let response = dispatch_handler(
            State(state),
            Path("no-such-unit".to_string()),
            Bytes::from("{}"),
        )
        .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(executor.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn undecodable_body_is_400_and_executor_untouched() {
        let executor = Arc::new(EchoExecutor::new(false));
        let state = state_with(Arc::clone(&executor));

        let response = dispatch_handler(
            State(state),
            Path("echo".to_string()),
            Bytes::from("{not json"),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(executor.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn executor_failure_is_opaque_500() {
        let executor = Arc::new(EchoExecutor::new(true));
        let state = state_with(executor);

        let response =
            dispatch_handler(State(state), Path("echo".to_string()), Bytes::from("{}")).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body, json!({"error": "unit execution failed"}));
    }

    #[tokio::test]
    async fn draining_server_rejects_dispatch_with_503() {
        let executor = Arc::new(EchoExecutor::new(false));
        let state = state_with(Arc::clone(&executor));
        state.shutdown.trigger_shutdown();

        let response =
            dispatch_handler(State(state), Path("echo".to_string()), Bytes::from("{}")).await;

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(executor.seen.lock().unwrap().is_empty());
    }
}
