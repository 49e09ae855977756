use std::path::Path;
use std::process::ExitStatus;

use async_trait::async_trait;
use serde_json::Value;

/// Errors from running a unit to completion.
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    /// The runner command could not be started at all.
    #[error("failed to spawn unit runner: {0}")]
    Spawn(#[source] std::io::Error),

    /// I/O failure while feeding input or collecting output.
    #[error("i/o error while driving unit: {0}")]
    Io(#[from] std::io::Error),

    /// The unit did not finish within the configured limit.
    #[error("unit execution exceeded {timeout_secs}s")]
    Timeout {
        /// The limit that was exceeded.
        timeout_secs: u64,
    },

    /// The unit process finished with a failure status.
    #[error("unit exited with {status}: {stderr}")]
    NonZeroExit {
        /// Exit status reported by the OS.
        status: ExitStatus,
        /// Captured stderr, trimmed, for the server log.
        stderr: String,
    },

    /// The unit finished but its output was not valid JSON.
    #[error("unit produced undecodable output: {0}")]
    Output(#[from] serde_json::Error),
}

/// Runs one unit with a decoded input payload and returns its output payload.
///
/// Implementations decide how a unit actually executes (separate process,
/// embedded interpreter, remote worker). The dispatcher holds exactly one
/// executor and never interprets unit content itself.
#[async_trait]
pub trait UnitExecutor: Send + Sync {
    /// Executes the unit stored at `unit` with `input` and returns its output.
    ///
    /// `unit` is the real source file path recorded at discovery time, not
    /// the derived service path.
    ///
    /// # Errors
    ///
    /// Returns an [`ExecutionError`] describing spawn, I/O, timeout, exit
    /// status, or output decoding failures.
    async fn execute(&self, unit: &Path, input: Value) -> Result<Value, ExecutionError>;
}
