//! Sequential execution of stored orchestrations.
//!
//! An orchestration is a record of the `Orchestration` entity. Its steps are
//! `OrchestrationStep` records run in `StepNumber` order, each one starting a
//! remote Connect or Matching job and waiting for the platform's monitor to
//! report it finished. Every event goes through [`LogSink`].

#[cfg(test)]
pub(crate) mod fake;
pub mod poller;
mod runner;
pub mod sink;

pub use poller::{Sleeper, ThreadSleeper, WaitOutcome};
pub use runner::StepResult;
pub use sink::LogSink;

use crate::client::MdmApi;
use crate::error::{MdmError, Result};
use crate::model::{
    field_text, parse_parameters, Orchestration, OrchestrationStep, ORCHESTRATION_ENTITY,
    ORCHESTRATION_STEP_ENTITY, SETTINGS_RECORD_CODE,
};
use crate::query::{escape_literal, Query};
use crate::settings::Settings;
use crate::types::{ErrorHandling, ExecutionMode, LogLevel};
use serde::Serialize;

/// Outcome of one orchestration (or ad-hoc process) run.
#[derive(Debug, Clone, Serialize)]
pub struct OrchestrationReport {
    pub code: String,
    pub what_if: bool,
    pub results: Vec<StepResult>,
    /// Codes of steps skipped because their parameters disable them.
    pub skipped: Vec<String>,
    /// Step that triggered an abort, if any.
    pub aborted_at: Option<String>,
    pub error: bool,
    pub message: String,
}

impl OrchestrationReport {
    pub fn succeeded(&self) -> bool {
        !self.error
    }
}

pub struct Orchestrator<'a, A: MdmApi> {
    api: &'a A,
    settings: Settings,
    what_if: bool,
    sleeper: Box<dyn Sleeper>,
}

impl<'a, A: MdmApi> Orchestrator<'a, A> {
    /// Build an orchestrator, applying the platform's `z_Settings` record
    /// on top of `settings`.
    pub fn new(api: &'a A, mut settings: Settings) -> Self {
        load_platform_settings(api, &mut settings);
        tracing::info!(
            "Orchestration settings: MinLogLevel={}, ActivityPollingInterval={}",
            settings.min_log_level,
            settings.activity_polling_interval
        );
        Self {
            api,
            settings,
            what_if: false,
            sleeper: Box::new(ThreadSleeper),
        }
    }

    pub fn what_if(mut self, what_if: bool) -> Self {
        self.what_if = what_if;
        self
    }

    pub fn with_sleeper(mut self, sleeper: impl Sleeper + 'static) -> Self {
        self.sleeper = Box::new(sleeper);
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    fn sink(&self) -> LogSink<'a, A> {
        LogSink::new(self.api, self.settings.min_log_level)
    }

    fn log(&self, orchestration: &str, step: Option<&str>, level: LogLevel, message: &str) {
        self.sink().log(orchestration, step, level, message);
    }

    /// Run the stored orchestration `code`.
    ///
    /// `Err` means the orchestration never started: it was not found, its
    /// parameters are invalid, it asks for an unsupported mode, or the
    /// platform could not be queried. Step failures are reported in the
    /// returned report instead.
    pub fn orchestrate(&self, code: &str) -> Result<OrchestrationReport> {
        let record = self
            .api
            .get_record(ORCHESTRATION_ENTITY, code)?
            .ok_or_else(|| MdmError::OrchestrationNotFound(code.to_string()))?;

        let orchestration = match Orchestration::from_record(&record) {
            Ok(o) => o,
            Err(e) => {
                self.log(
                    code,
                    None,
                    LogLevel::Error,
                    &format!("Orchestration '{code}' not found or has invalid parameters: {e}"),
                );
                return Err(e);
            }
        };

        if orchestration.mode == ExecutionMode::Concurrent {
            let message =
                format!("Orchestration '{code}' requests Concurrent mode, which is not supported.");
            self.log(code, None, LogLevel::Error, &message);
            return Err(MdmError::UnsupportedMode {
                code: code.to_string(),
                mode: orchestration.mode.to_string(),
            });
        }

        self.log(
            code,
            None,
            LogLevel::Information,
            &format!(
                "Starting orchestration '{code}' with parameters '{}' running with Mode({}) and AbortOnError({}).",
                orchestration.parameters_text,
                orchestration.mode,
                orchestration.error_handling.aborts()
            ),
        );

        let steps = self.load_steps(code)?;
        if steps.is_empty() {
            self.log(
                code,
                None,
                LogLevel::Warning,
                &format!("Orchestration '{code}' has no steps."),
            );
        }
        Ok(self.run_steps(code, orchestration.error_handling, &steps))
    }

    /// Run a single process outside any stored orchestration. The process
    /// name doubles as orchestration and step code.
    pub fn run_process(
        &self,
        name: &str,
        process_type: &str,
        parameters: &str,
    ) -> OrchestrationReport {
        let step = OrchestrationStep {
            code: name.to_string(),
            name: name.to_string(),
            step_number: 1,
            process_type: process_type.to_string(),
            parameters_text: parameters.to_string(),
        };
        self.log(
            name,
            Some(name),
            LogLevel::Information,
            &format!("Running {process_type} process '{name}' with parameters '{parameters}'."),
        );
        self.run_steps(name, ErrorHandling::Abort, std::slice::from_ref(&step))
    }

    fn load_steps(&self, code: &str) -> Result<Vec<OrchestrationStep>> {
        let query = Query::filter(format!("[Orchestration] eq '{}'", escape_literal(code)))
            .order_by("[StepNumber]");
        let c = self.api.get_records(ORCHESTRATION_STEP_ENTITY, &query)?;
        if !c.is_success() {
            return Err(crate::client::remote_error(&c));
        }
        let mut steps: Vec<OrchestrationStep> = c
            .data()
            .as_array()
            .map(|a| a.iter().map(OrchestrationStep::from_record).collect())
            .unwrap_or_default();
        steps.sort_by_key(|s| s.step_number);
        Ok(steps)
    }

    fn run_steps(
        &self,
        code: &str,
        error_handling: ErrorHandling,
        steps: &[OrchestrationStep],
    ) -> OrchestrationReport {
        let mut report = OrchestrationReport {
            code: code.to_string(),
            what_if: self.what_if,
            results: Vec::new(),
            skipped: Vec::new(),
            aborted_at: None,
            error: false,
            message: String::new(),
        };

        for step in steps {
            let Some(result) = self.run_step(code, step) else {
                report.skipped.push(step.code.clone());
                continue;
            };
            let failed = result.error;
            report.results.push(result);
            if failed && error_handling.aborts() {
                self.log(
                    code,
                    Some(&step.code),
                    LogLevel::Error,
                    &format!(
                        "Aborting orchestration '{code}' due to error in step '{}'",
                        step.code
                    ),
                );
                report.aborted_at = Some(step.code.clone());
                break;
            }
        }

        report.error = report.results.iter().any(|r| r.error);
        report.message = if report.error {
            format!("Orchestration '{code}' completed with errors.")
        } else {
            format!("Orchestration '{code}' completed successfully.")
        };
        let level = if report.error {
            LogLevel::Error
        } else {
            LogLevel::Information
        };
        self.log(code, None, level, &report.message);
        report
    }
}

fn load_platform_settings<A: MdmApi>(api: &A, settings: &mut Settings) {
    let record = match api.get_record(ORCHESTRATION_ENTITY, SETTINGS_RECORD_CODE) {
        Ok(Some(record)) => record,
        Ok(None) => {
            tracing::debug!("no {SETTINGS_RECORD_CODE} record, using local settings");
            return;
        }
        Err(e) => {
            tracing::warn!("could not read {SETTINGS_RECORD_CODE} record: {e}");
            return;
        }
    };
    let text = field_text(&record, "Parameters").unwrap_or_default();
    match parse_parameters(SETTINGS_RECORD_CODE, &text) {
        Ok(params) => settings.apply_platform_overrides(&params),
        Err(e) => tracing::warn!("ignoring {SETTINGS_RECORD_CODE} record: {e}"),
    }
}
