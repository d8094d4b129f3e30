//! The submission gate — the seam the transport layer calls.
//!
//! One call per submission: validate the payload, scan it, short-circuit
//! with a block response when the scan says no, otherwise run it and
//! attach the report to the outcome. The gate holds only shared read-only
//! state, so a single instance serves any number of concurrent requests.

use serde_derive::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    analyzer::{Analyzer, SecurityReport},
    config::Settings,
    error::{Error, Result},
    executor::Executor,
    sandbox,
};

/// Error text returned on a blocked submission.
const BLOCKED_ERROR: &str = "Code blocked by security policy";

/// The full response shape for one submission: execution fields plus the
/// security report that produced the decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionOutcome {
    pub success: bool,
    pub output: String,
    pub error: String,
    pub exit_code: i32,
    pub execution_time: f64,
    pub security_report: SecurityReport,
}

/// Gates submissions: analyze first, execute only what is allowed.
pub struct Gate {
    analyzer: Analyzer,
    executor: Executor,
    max_execution_time_secs: u64,
    max_code_bytes: usize,
    max_code_lines: usize,
}

impl Gate {
    /// Build a gate from settings: materialize the catalog, construct the
    /// configured sandbox backend.
    ///
    /// # Errors
    /// When the catalog cannot be loaded or the backend is unavailable.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let analyzer = Analyzer::new(settings.active_rules()?, settings.block_policy());
        let executor = Executor::new(sandbox::create_sandbox(settings)?, settings.max_output_bytes);
        Ok(Self {
            analyzer,
            executor,
            max_execution_time_secs: settings.max_execution_time_secs,
            max_code_bytes: settings.max_code_bytes,
            max_code_lines: settings.max_code_lines,
        })
    }

    #[must_use]
    pub fn analyzer(&self) -> &Analyzer {
        &self.analyzer
    }

    /// Handle one submission end to end.
    ///
    /// A missing timeout uses the configured cap; a requested timeout is
    /// clamped to the cap. The only error path is payload validation —
    /// blocked submissions and failed runs are ordinary outcomes.
    ///
    /// # Errors
    /// [`Error::Validation`] when the payload is empty, oversized or the
    /// timeout is zero.
    pub async fn submit(
        &self,
        code: &str,
        timeout_secs: Option<u64>,
    ) -> Result<SubmissionOutcome> {
        self.validate(code, timeout_secs)?;
        let timeout_secs = timeout_secs
            .unwrap_or(self.max_execution_time_secs)
            .min(self.max_execution_time_secs);

        let submission_id = Uuid::new_v4();
        let report = self.analyzer.analyze(code);

        if !report.allowed {
            warn!(
                id = %submission_id,
                violations = report.violations.len(),
                "submission blocked"
            );
            return Ok(SubmissionOutcome {
                success: false,
                output: String::new(),
                error: BLOCKED_ERROR.to_string(),
                exit_code: 1,
                execution_time: 0.0,
                security_report: report,
            });
        }

        info!(
            id = %submission_id,
            complexity = report.complexity_score,
            timeout_secs,
            "submission accepted, executing"
        );
        let result = self.executor.execute(code, timeout_secs).await;
        info!(
            id = %submission_id,
            success = result.success,
            elapsed_seconds = result.elapsed_seconds,
            "submission settled"
        );

        Ok(SubmissionOutcome {
            success: result.success,
            output: result.output,
            error: result.error,
            exit_code: result.exit_code,
            execution_time: result.elapsed_seconds,
            security_report: report,
        })
    }

    fn validate(&self, code: &str, timeout_secs: Option<u64>) -> Result<()> {
        if code.trim().is_empty() {
            return Err(Error::Validation("code must not be empty".to_string()));
        }
        if code.len() > self.max_code_bytes {
            return Err(Error::Validation(format!(
                "code exceeds {} bytes",
                self.max_code_bytes
            )));
        }
        if code.lines().count() > self.max_code_lines {
            return Err(Error::Validation(format!(
                "code exceeds {} lines",
                self.max_code_lines
            )));
        }
        if timeout_secs == Some(0) {
            return Err(Error::Validation(
                "timeout must be at least one second".to_string(),
            ));
        }
        Ok(())
    }
}
