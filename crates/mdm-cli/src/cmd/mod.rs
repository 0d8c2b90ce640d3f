pub mod connection;
pub mod orchestrate;
pub mod process;

use mdm_core::MdmError;

// ---------------------------------------------------------------------------
// RunExit: typed non-zero exit codes, resolved in main
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum RunExit {
    StepsFailed {
        code: String,
        failed: usize,
        aborted_at: Option<String>,
    },
    Rejected {
        code: String,
        reason: String,
    },
}

impl RunExit {
    pub fn exit_code(&self) -> i32 {
        match self {
            RunExit::StepsFailed { .. } => 2,
            RunExit::Rejected { .. } => 3,
        }
    }

    /// Map errors that stop an orchestration before any step runs.
    pub fn rejected(code: &str, error: &MdmError) -> Option<Self> {
        match error {
            MdmError::OrchestrationNotFound(_)
            | MdmError::InvalidParameters { .. }
            | MdmError::UnsupportedMode { .. } => Some(RunExit::Rejected {
                code: code.to_string(),
                reason: error.to_string(),
            }),
            _ => None,
        }
    }
}

impl std::fmt::Display for RunExit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunExit::StepsFailed {
                code,
                failed,
                aborted_at: Some(step),
            } => write!(
                f,
                "orchestration '{code}' aborted at step '{step}' ({failed} step(s) failed)"
            ),
            RunExit::StepsFailed { code, failed, .. } => {
                write!(f, "orchestration '{code}' finished with {failed} failed step(s)")
            }
            RunExit::Rejected { code, reason } => {
                write!(f, "orchestration '{code}' was not run: {reason}")
            }
        }
    }
}

impl std::error::Error for RunExit {}

/// `Err(RunExit::StepsFailed)` if any step in the report failed.
pub fn check_report(report: &mdm_core::orchestrator::OrchestrationReport) -> anyhow::Result<()> {
    if report.succeeded() {
        return Ok(());
    }
    Err(RunExit::StepsFailed {
        code: report.code.clone(),
        failed: report.results.iter().filter(|r| r.error).count(),
        aborted_at: report.aborted_at.clone(),
    }
    .into())
}
