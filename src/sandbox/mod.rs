//! Pluggable sandbox backends for evaluating accepted source.
//!
//! Two tiers are provided, selected by configuration:
//!
//! - [`WorkerSandbox`]: out-of-process Node.js worker, forcibly killed at
//!   the deadline. Strong, host-enforced termination; the default.
//! - [`IsolateSandbox`]: in-process JavaScript isolate (feature `isolate`).
//!   Fast, weak isolation; on timeout the evaluation thread is discarded
//!   and keeps running until it finishes on its own.
//!
//! A backend enforces its own deadline so the executor always gets a
//! settled outcome; the executor only adds a backstop monitor on top.

mod scope;
mod worker;

#[cfg(feature = "isolate")]
mod isolate;

use std::time::Duration;

use async_trait::async_trait;

use crate::{config::Settings, error::Result};

#[cfg(feature = "isolate")]
pub use isolate::IsolateSandbox;
pub use worker::WorkerSandbox;

/// How a single sandbox run settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SandboxOutcome {
    /// The script ran to completion (successfully or by throwing).
    Completed {
        success: bool,
        /// Everything the console-capture surface collected.
        output: String,
        /// Thrown error text; empty on success.
        error: String,
    },
    /// The deadline fired first. `output` holds whatever the capture
    /// surface had accumulated by then (backends that cannot observe
    /// partial output return an empty string).
    TimedOut { output: String },
}

/// A sandbox evaluates one script inside a restricted scope that exposes
/// only the console capture channels, and settles within the deadline.
#[async_trait]
pub trait Sandbox: Send + Sync {
    /// Evaluate `source` and settle within `deadline`.
    ///
    /// # Errors
    /// Only for backend failures (missing interpreter, scratch-dir I/O).
    /// Script-originated failures are data in the returned outcome.
    async fn run(&self, source: &str, deadline: Duration) -> Result<SandboxOutcome>;

    /// Short backend name used in logs.
    fn name(&self) -> &'static str;
}

/// The sandbox backend to construct.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, serde_derive::Serialize, serde_derive::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Worker,
    Isolate,
}

/// Create a sandbox backend based on the configuration.
///
/// # Errors
/// When the configured backend is not compiled into this build.
pub fn create_sandbox(settings: &Settings) -> Result<Box<dyn Sandbox>> {
    match settings.backend {
        BackendKind::Worker => Ok(Box::new(WorkerSandbox::new(
            settings.runtime_command.clone(),
        ))),
        #[cfg(feature = "isolate")]
        BackendKind::Isolate => Ok(Box::new(IsolateSandbox::new())),
        #[cfg(not(feature = "isolate"))]
        BackendKind::Isolate => Err(crate::error::Error::Config(
            "isolate backend requested but this build has no `isolate` feature".to_string(),
        )),
    }
}
