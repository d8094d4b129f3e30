//! Out-of-process worker backend.
//!
//! The submission is wrapped in a console-capture harness, written to a
//! private scratch directory and handed to a Node.js child process with a
//! scrubbed environment. The child is killed and reaped when the deadline
//! fires, so even a tight CPU loop cannot outlive its budget. This is the
//! host-enforced termination tier.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::{debug, warn};

use super::scope;
use super::{Sandbox, SandboxOutcome};
use crate::error::{Error, Result};

/// Harness around the submitted source. The script body is wrapped in an
/// async IIFE so top-level `await` works, with `sleep` provided as the
/// standard suspension helper. All console channels write to stdout so the
/// capture buffer preserves one interleaved order; stderr is reserved for
/// the uncaught-error report.
const WORKER_HARNESS: &str = r"'use strict';
__FORMAT__
const __emit = (tag, args) => {
  process.stdout.write((tag ? tag + ' ' : '') + __fmt(args) + '\n');
};
console.log = (...args) => __emit('', args);
console.info = (...args) => __emit('', args);
console.warn = (...args) => __emit('[warn]', args);
console.error = (...args) => __emit('[error]', args);
console.debug = (...args) => __emit('[debug]', args);
const sleep = (ms) => new Promise((resolve) => setTimeout(resolve, ms));
(async () => {
__SOURCE__
})().then(
  () => process.exit(0),
  (err) => {
    process.stderr.write(String((err && err.stack) || err));
    process.exit(1);
  },
);
";

/// Sandbox that runs each submission as a short-lived interpreter process.
#[derive(Debug, Clone)]
pub struct WorkerSandbox {
    runtime_command: String,
}

impl WorkerSandbox {
    #[must_use]
    pub fn new(runtime_command: String) -> Self {
        Self { runtime_command }
    }
}

#[async_trait]
impl Sandbox for WorkerSandbox {
    async fn run(&self, source: &str, deadline: Duration) -> Result<SandboxOutcome> {
        let scratch = tempfile::Builder::new()
            .prefix("scriptgate-")
            .tempdir()
            .map_err(|e| Error::Sandbox(format!("could not create scratch dir: {e}")))?;

        let script_path = scratch.path().join("main.js");
        std::fs::write(&script_path, scope::render(WORKER_HARNESS, source))
            .map_err(|e| Error::Sandbox(format!("could not write script: {e}")))?;

        // Scrubbed environment: the interpreter must still resolve via PATH,
        // everything else points into the scratch directory.
        let path_var = std::env::var("PATH").unwrap_or_else(|_| "/usr/bin:/bin".to_string());

        let mut child = Command::new(&self.runtime_command)
            .arg(&script_path)
            .current_dir(scratch.path())
            .env_clear()
            .env("PATH", path_var)
            .env("HOME", scratch.path())
            .env("TMPDIR", scratch.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                Error::Sandbox(format!(
                    "could not spawn runtime {:?}: {e}",
                    self.runtime_command
                ))
            })?;

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Sandbox("worker stdout was not captured".to_string()))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| Error::Sandbox("worker stderr was not captured".to_string()))?;

        // Drain both pipes concurrently so a chatty script cannot deadlock
        // on a full pipe buffer. The readers finish once the pipes close,
        // which a kill guarantees.
        let stdout_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            let _ = stdout.read_to_end(&mut buf).await;
            buf
        });
        let stderr_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            let _ = stderr.read_to_end(&mut buf).await;
            buf
        });

        let status = tokio::select! {
            status = child.wait() => Some(status.map_err(|e| Error::Sandbox(format!("wait failed: {e}")))?),
            () = tokio::time::sleep(deadline) => None,
        };

        if status.is_none() {
            warn!(runtime = %self.runtime_command, "deadline fired, killing worker");
            if let Err(e) = child.start_kill() {
                warn!(error = %e, "worker kill failed");
            }
            // Reap so the child never outlives the call.
            let _ = child.wait().await;
        }

        let stdout_buf = stdout_task.await.unwrap_or_default();
        let stderr_buf = stderr_task.await.unwrap_or_default();
        let output = String::from_utf8_lossy(&stdout_buf).into_owned();
        let error_text = String::from_utf8_lossy(&stderr_buf).trim().to_string();

        let outcome = match status {
            None => SandboxOutcome::TimedOut { output },
            Some(status) => {
                debug!(?status, "worker settled");
                let success = status.success();
                let error = if success {
                    String::new()
                } else if error_text.is_empty() {
                    format!("script runtime exited with {status}")
                } else {
                    error_text
                };
                SandboxOutcome::Completed {
                    success,
                    output,
                    error,
                }
            }
        };

        Ok(outcome)
    }

    fn name(&self) -> &'static str {
        "worker"
    }
}
