//! Bounded execution of accepted source.
//!
//! The executor owns no evaluation machinery itself: it hands the source to
//! the configured [`Sandbox`] backend, measures wall-clock time, applies
//! the output cap and folds every way a run can end (completion, thrown
//! error, deadline, backend failure) into one structured
//! [`ExecutionResult`]. Script-originated failures are data here, never
//! errors; `execute` has no error path.

use std::time::{Duration, Instant};

use serde_derive::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::sandbox::{Sandbox, SandboxOutcome};

/// Extra slack the backstop monitor grants a backend past the deadline.
/// Backends enforce the deadline themselves; the monitor only catches a
/// backend that wedged and never settled.
const MONITOR_GRACE: Duration = Duration::from_secs(2);

/// Marker appended when captured output exceeds the configured cap.
const TRUNCATION_MARKER: &str = "\n... (output truncated)";

/// The outcome of actually running an accepted script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub success: bool,
    /// Everything the console channels captured before settlement.
    pub output: String,
    /// Thrown-error or timeout text; empty on success.
    pub error: String,
    /// `0` on success, `1` on any failure.
    pub exit_code: i32,
    /// Wall-clock time from call start to settlement.
    pub elapsed_seconds: f64,
}

/// Runs accepted source under a wall-clock deadline.
pub struct Executor {
    sandbox: Box<dyn Sandbox>,
    max_output_bytes: usize,
}

impl Executor {
    #[must_use]
    pub fn new(sandbox: Box<dyn Sandbox>, max_output_bytes: usize) -> Self {
        Self {
            sandbox,
            max_output_bytes,
        }
    }

    /// Evaluate `source` with a deadline of `timeout_secs`.
    ///
    /// The caller is expected to have obtained an allowed
    /// [`crate::SecurityReport`] first; no security filtering happens here.
    /// Each call is independent: `Pending -> Completed | TimedOut`, no
    /// retries at this layer.
    pub async fn execute(&self, source: &str, timeout_secs: u64) -> ExecutionResult {
        let deadline = Duration::from_secs(timeout_secs);
        let started = Instant::now();

        let run = self.sandbox.run(source, deadline);
        let outcome = match tokio::time::timeout(deadline + MONITOR_GRACE, run).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(err)) => {
                warn!(backend = self.sandbox.name(), error = %err, "sandbox failure");
                SandboxOutcome::Completed {
                    success: false,
                    output: String::new(),
                    error: format!("sandbox failure: {err}"),
                }
            }
            Err(_elapsed) => {
                warn!(
                    backend = self.sandbox.name(),
                    "backend missed its own deadline; monitor aborted the run"
                );
                SandboxOutcome::TimedOut {
                    output: String::new(),
                }
            }
        };

        let elapsed_seconds = started.elapsed().as_secs_f64();
        debug!(
            backend = self.sandbox.name(),
            elapsed_seconds, "execution settled"
        );

        match outcome {
            SandboxOutcome::Completed {
                success,
                output,
                error,
            } => ExecutionResult {
                success,
                output: truncate_output(output, self.max_output_bytes),
                error,
                exit_code: i32::from(!success),
                elapsed_seconds,
            },
            SandboxOutcome::TimedOut { output } => ExecutionResult {
                success: false,
                output: truncate_output(output, self.max_output_bytes),
                error: format!("Execution timeout after {timeout_secs}s"),
                exit_code: 1,
                elapsed_seconds,
            },
        }
    }
}

/// Cap captured output at `max_bytes`, appending a marker when cut.
fn truncate_output(output: String, max_bytes: usize) -> String {
    if output.len() <= max_bytes {
        return output;
    }
    let mut cut = max_bytes;
    while cut > 0 && !output.is_char_boundary(cut) {
        cut -= 1;
    }
    let mut truncated = output[..cut].to_string();
    truncated.push_str(TRUNCATION_MARKER);
    truncated
}
