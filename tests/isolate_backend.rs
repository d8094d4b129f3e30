//! In-process isolate scenarios (feature `isolate`). No external
//! interpreter needed — the isolate is compiled into the test binary.
#![cfg(feature = "isolate")]

use scriptgate::{sandbox::IsolateSandbox, BackendKind, Executor, Gate, Settings};

fn executor() -> Executor {
    Executor::new(Box::new(IsolateSandbox::new()), 8192)
}

#[tokio::test]
async fn test_sync_script_with_console_output() {
    let result = executor().execute("console.log('hi'); 2 + 2;", 10).await;
    assert!(result.success, "error was: {}", result.error);
    assert!(result.output.contains("hi"));
    assert_eq!(result.exit_code, 0);
}

#[tokio::test]
async fn test_thrown_error_is_reported() {
    let result = executor().execute("throw new Error('x')", 10).await;
    assert!(!result.success);
    assert!(result.error.contains('x'), "error: {:?}", result.error);
    assert_eq!(result.exit_code, 1);
}

#[tokio::test]
async fn test_output_before_a_throw_is_kept() {
    let result = executor()
        .execute("console.log('before'); throw new Error('late');", 10)
        .await;
    assert!(!result.success);
    assert!(result.output.contains("before"));
}

#[tokio::test]
async fn test_cpu_bound_loop_is_discarded_at_the_deadline() {
    // The evaluation thread cannot be preempted; the run is discarded and
    // the thread leaks until this test process exits. That asymmetry with
    // the worker backend is exactly why the worker is the default.
    let result = executor().execute("let i = 0; while(true) { i += 1; }", 1).await;
    assert!(!result.success);
    assert_eq!(result.error, "Execution timeout after 1s");
    assert!(result.output.is_empty());
}

#[tokio::test]
async fn test_gate_with_isolate_backend() {
    let settings = Settings {
        backend: BackendKind::Isolate,
        ..Default::default()
    };
    let gate = Gate::from_settings(&settings).unwrap();
    let outcome = gate.submit("console.log('ok');", Some(5)).await.unwrap();
    assert!(outcome.success, "error was: {}", outcome.error);
    assert!(outcome.output.contains("ok"));
    assert!(outcome.security_report.allowed);
}
