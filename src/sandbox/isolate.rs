//! In-process isolate backend (feature `isolate`).
//!
//! Evaluates the submission on a blocking thread inside a bare `deno_core`
//! JavaScript runtime whose global scope is reduced to the console-capture
//! surface. Evaluation is synchronous — no event loop is pumped, so the
//! scripts this tier fits are straight-line computations; anything that
//! needs timers or other suspension points belongs on the worker backend.
//!
//! Weak-isolation caveat: when the deadline fires the evaluation thread
//! cannot be preempted. The run is discarded and the thread keeps burning
//! CPU until the script finishes on its own. That leak is logged loudly;
//! this tier must not face adversarial input.

use std::time::Duration;

use async_trait::async_trait;
use deno_core::{v8, JsRuntime, RuntimeOptions};
use tracing::warn;

use super::scope;
use super::{Sandbox, SandboxOutcome};
use crate::error::Result;

/// Installs the capture sink and the console surface. Runs before the
/// submission in the same isolate.
const SCOPE_PRELUDE: &str = r"(() => {
__FORMAT__
  const sink = [];
  globalThis.__scriptgate_sink = sink;
  const emit = (tag, args) => {
    sink.push((tag ? tag + ' ' : '') + __fmt(args));
  };
  globalThis.console = {
    log: (...args) => emit('', args),
    info: (...args) => emit('', args),
    warn: (...args) => emit('[warn]', args),
    error: (...args) => emit('[error]', args),
    debug: (...args) => emit('[debug]', args),
  };
})();
";

/// Reads the capture sink back out of the isolate after evaluation.
const DRAIN_SINK: &str = "globalThis.__scriptgate_sink.join('\\n')";

/// Sandbox that evaluates submissions inside the host process.
#[derive(Debug, Clone, Default)]
pub struct IsolateSandbox;

impl IsolateSandbox {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Sandbox for IsolateSandbox {
    async fn run(&self, source: &str, deadline: Duration) -> Result<SandboxOutcome> {
        let source = source.to_string();
        let evaluation = tokio::task::spawn_blocking(move || evaluate_in_scope(&source));

        match tokio::time::timeout(deadline, evaluation).await {
            Ok(Ok(outcome)) => Ok(outcome),
            Ok(Err(join_err)) => {
                // A panic inside the isolate thread is a backend defect,
                // reported as a failed run rather than crossing the boundary.
                warn!(error = %join_err, "isolate evaluation panicked");
                Ok(SandboxOutcome::Completed {
                    success: false,
                    output: String::new(),
                    error: format!("isolate evaluation failed: {join_err}"),
                })
            }
            Err(_elapsed) => {
                warn!(
                    deadline_secs = deadline.as_secs(),
                    "deadline fired; discarding isolate evaluation thread, which keeps \
                     running (and burning CPU) until the script completes on its own"
                );
                Ok(SandboxOutcome::TimedOut {
                    output: String::new(),
                })
            }
        }
    }

    fn name(&self) -> &'static str {
        "isolate"
    }
}

/// Run one submission to completion inside a fresh isolate.
fn evaluate_in_scope(source: &str) -> SandboxOutcome {
    let mut runtime = JsRuntime::new(RuntimeOptions::default());

    let prelude = scope::render(SCOPE_PRELUDE, "");
    if let Err(e) = runtime.execute_script("scriptgate:scope", prelude) {
        return SandboxOutcome::Completed {
            success: false,
            output: String::new(),
            error: format!("could not install evaluation scope: {e}"),
        };
    }

    let (success, error) = match runtime.execute_script("scriptgate:submission", source.to_string())
    {
        Ok(_) => (true, String::new()),
        Err(e) => (false, e.to_string()),
    };

    // The sink survives a thrown submission, so partial output is kept.
    let output = drain_sink(&mut runtime);

    SandboxOutcome::Completed {
        success,
        output,
        error,
    }
}

fn drain_sink(runtime: &mut JsRuntime) -> String {
    match runtime.execute_script("scriptgate:drain", DRAIN_SINK) {
        Ok(value) => {
            let scope = &mut runtime.handle_scope();
            let local = v8::Local::new(scope, &value);
            local
                .to_string(scope)
                .map(|s| s.to_rust_string_lossy(scope))
                .unwrap_or_default()
        }
        Err(_) => String::new(),
    }
}
