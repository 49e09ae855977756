//! Out-of-process unit execution.
//!
//! Each dispatch spawns the configured runner command as a child process,
//! feeds the request payload on stdin, and reads the response payload from
//! stdout. stderr is captured for the server log only and never reaches a
//! consumer.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use unitdock_core::traits::{ExecutionError, UnitExecutor};

use crate::config::RunnerConfig;

/// Placeholder in a runner argument that is replaced with the unit path.
const UNIT_PLACEHOLDER: &str = "{unit}";

/// Executor that runs one child process per request.
pub struct ProcessUnitExecutor {
    command: String,
    args: Vec<String>,
    timeout: Duration,
}

impl ProcessUnitExecutor {
    #[must_use]
    pub fn new(config: &RunnerConfig) -> Self {
        Self {
            command: config.command.clone(),
            args: config.args.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    /// Substitutes the unit path into the argument template. When no
    /// argument carries the placeholder, the path is appended as the final
    /// argument.
    fn render_args(&self, unit: &Path) -> Vec<String> {
        let unit_path = unit.to_string_lossy();
        let mut substituted = false;
        let mut args: Vec<String> = self
            .args
            .iter()
            .map(|arg| {
                if arg.contains(UNIT_PLACEHOLDER) {
                    substituted = true;
                    arg.replace(UNIT_PLACEHOLDER, &unit_path)
                } else {
                    arg.clone()
                }
            })
            .collect();
        if !substituted {
            args.push(unit_path.into_owned());
        }
        args
    }
}

#[async_trait]
impl UnitExecutor for ProcessUnitExecutor {
    async fn execute(&self, unit: &Path, input: Value) -> Result<Value, ExecutionError> {
        let args = self.render_args(unit);
        debug!(unit = %unit.display(), command = %self.command, "spawning unit runner");

        let mut child = Command::new(&self.command)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(ExecutionError::Spawn)?;

        if let Some(mut stdin) = child.stdin.take() {
            // A runner may exit without reading its input; its exit status
            // then carries the real story, so a broken pipe here is not
            // itself a failure.
            if let Err(error) = stdin.write_all(input.to_string().as_bytes()).await {
                debug!(unit = %unit.display(), %error, "unit runner stopped reading input");
            }
            drop(stdin);
        }

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_elapsed) => {
                warn!(
                    unit = %unit.display(),
                    timeout_secs = self.timeout.as_secs(),
                    "unit execution timed out, killing runner"
                );
                return Err(ExecutionError::Timeout {
                    timeout_secs: self.timeout.as_secs(),
                });
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(ExecutionError::NonZeroExit {
                status: output.status,
                stderr,
            });
        }

        Ok(serde_json::from_slice(&output.stdout)?)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;

    fn runner(command: &str, args: &[&str], timeout_secs: u64) -> RunnerConfig {
        RunnerConfig {
            command: command.to_string(),
            args: args.iter().map(ToString::to_string).collect(),
            timeout_secs,
        }
    }

    #[test]
    fn placeholder_is_substituted_into_args() {
        let executor = ProcessUnitExecutor::new(&runner("python3", &["run", "{unit}"], 60));
        let args = executor.render_args(Path::new("/units/read_meter.ipynb"));
        assert_eq!(args, vec!["run", "/units/read_meter.ipynb"]);
    }

    #[test]
    fn unit_path_is_appended_when_no_placeholder() {
        let executor = ProcessUnitExecutor::new(&runner("python3", &["run"], 60));
        let args = executor.render_args(Path::new("/units/echo.ipynb"));
        assert_eq!(args, vec!["run", "/units/echo.ipynb"]);
    }

    #[tokio::test]
    async fn stdin_payload_reaches_the_runner() {
        // `sh -c cat <unit>` binds the unit path to $0 and echoes stdin.
        let executor = ProcessUnitExecutor::new(&runner("sh", &["-c", "cat"], 10));
        let input = json!({"value": 21, "text": "hi"});

        let output = executor
            .execute(Path::new("/units/echo.ipynb"), input.clone())
            .await
            .expect("execute");
        assert_eq!(output, input);
    }

    #[tokio::test]
    async fn unit_file_contents_flow_through_the_placeholder() {
        let dir = TempDir::new().expect("tempdir");
        let unit = dir.path().join("stored.ipynb");
        std::fs::write(&unit, r#"{"from":"file"}"#).expect("write unit");

        let executor =
            ProcessUnitExecutor::new(&runner("sh", &["-c", "cat >/dev/null; cat {unit}"], 10));

        let output = executor
            .execute(&unit, json!({"ignored": true}))
            .await
            .expect("execute");
        assert_eq!(output, json!({"from": "file"}));
    }

    #[tokio::test]
    async fn non_zero_exit_carries_status_and_stderr() {
        let executor = ProcessUnitExecutor::new(&runner(
            "sh",
            &["-c", "cat >/dev/null; echo boom >&2; exit 3"],
            10,
        ));

        let err = executor
            .execute(Path::new("/units/broken.ipynb"), json!({}))
            .await
            .unwrap_err();
        match err {
            ExecutionError::NonZeroExit { status, stderr } => {
                assert_eq!(status.code(), Some(3));
                assert_eq!(stderr, "boom");
            }
            other => panic!("expected NonZeroExit, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn undecodable_output_is_an_output_error() {
        let executor =
            ProcessUnitExecutor::new(&runner("sh", &["-c", "cat >/dev/null; echo not-json"], 10));

        let err = executor
            .execute(Path::new("/units/noise.ipynb"), json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutionError::Output(_)));
    }

    #[tokio::test]
    async fn missing_command_is_a_spawn_error() {
        let executor = ProcessUnitExecutor::new(&runner("/nonexistent/unit-runner", &[], 10));

        let err = executor
            .execute(Path::new("/units/echo.ipynb"), json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutionError::Spawn(_)));
    }

    #[tokio::test]
    async fn slow_unit_times_out() {
        let executor = ProcessUnitExecutor::new(&runner("sh", &["-c", "sleep 3"], 1));

        let err = executor
            .execute(Path::new("/units/slow.ipynb"), json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutionError::Timeout { timeout_secs: 1 }));
    }
}
