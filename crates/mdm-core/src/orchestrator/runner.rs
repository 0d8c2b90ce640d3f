use super::poller::{self, PollRequest, WaitOutcome};
use super::Orchestrator;
use crate::client::MdmApi;
use crate::error::Result;
use crate::model::{OrchestrationStep, StepParameters, StepProcess};
use crate::types::{LogLevel, ProcessType};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

/// Outcome of one executed step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepResult {
    pub orchestration: String,
    pub step: String,
    pub name: String,
    pub process_type: String,
    pub parameters: Value,
    pub error: bool,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
struct StepStatus {
    error: bool,
    message: String,
}

impl StepStatus {
    fn succeeded(message: String) -> Self {
        Self {
            error: false,
            message,
        }
    }

    fn failed(message: String) -> Self {
        Self {
            error: true,
            message,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct StartOutcome {
    started: bool,
    status: Option<u16>,
    message: String,
    response: Value,
}

impl<'a, A: MdmApi> Orchestrator<'a, A> {
    /// Execute one step. `None` means the step is disabled and was skipped.
    pub(super) fn run_step(
        &self,
        orchestration: &str,
        step: &OrchestrationStep,
    ) -> Option<StepResult> {
        let result = |parameters: Value, status: StepStatus| StepResult {
            orchestration: orchestration.to_string(),
            step: step.code.clone(),
            name: step.name.clone(),
            process_type: step.process_type.clone(),
            parameters,
            error: status.error,
            message: status.message,
        };

        let params = match step.parameters() {
            Ok(p) => p,
            Err(e) => {
                let message =
                    format!("Orchestration Step '{}' has invalid parameters: {e}", step.code);
                self.log(orchestration, Some(&step.code), LogLevel::Error, &message);
                return Some(result(
                    Value::String(step.parameters_text.clone()),
                    StepStatus::failed(message),
                ));
            }
        };

        if !params.enabled {
            self.log(
                orchestration,
                Some(&step.code),
                LogLevel::Warning,
                &format!("Skipping disabled step '{}' ({})", step.code, step.name),
            );
            return None;
        }

        let op = format!(
            "Run({orchestration}, {}, {}, {})",
            step.code, step.name, step.process_type
        );
        let status = self
            .traced(orchestration, &step.code, &op, || {
                Ok(self.execute(orchestration, step, &params))
            })
            .unwrap_or_else(|e| StepStatus::failed(e.to_string()));

        Some(result(params.raw.clone(), status))
    }

    fn execute(
        &self,
        orchestration: &str,
        step: &OrchestrationStep,
        params: &StepParameters,
    ) -> StepStatus {
        let since = Utc::now();

        let op = format!("StartProcess({}, {})", step.name, step.process_type);
        let start = match self.traced(orchestration, &step.code, &op, || {
            self.start_process(orchestration, step, params)
        }) {
            Ok(start) => start,
            Err(e) => {
                return StepStatus::failed(format!(
                    "Error starting {} process '{}': {e}",
                    step.process_type, step.name
                ))
            }
        };
        if !start.started {
            return StepStatus::failed(start.message);
        }

        let op = format!("WaitForCompletion({}, {})", step.name, step.process_type);
        let wait = match self.traced(orchestration, &step.code, &op, || {
            self.wait(orchestration, step, params, since)
        }) {
            Ok(wait) => wait,
            Err(e) => return StepStatus::failed(e.to_string()),
        };
        if !wait.successful {
            return StepStatus::failed(format!(
                "{} process '{}' did not succeed: {}",
                step.process_type,
                step.name,
                wait.statuses()
            ));
        }

        StepStatus::succeeded(format!(
            "Running {} with parameters {}",
            step.process_type, params.raw
        ))
    }

    fn start_process(
        &self,
        orchestration: &str,
        step: &OrchestrationStep,
        params: &StepParameters,
    ) -> Result<StartOutcome> {
        let (kind, response) = match &params.process {
            StepProcess::Unknown { process_type } => {
                let message = format!(
                    "Unknown ProcessType '{process_type}' for orchestration '{orchestration}'."
                );
                self.log(orchestration, Some(&step.code), LogLevel::Error, &message);
                return Ok(StartOutcome {
                    started: false,
                    status: None,
                    message,
                    response: Value::Null,
                });
            }
            StepProcess::Connect { filter, codes, .. } => {
                if self.what_if {
                    let outcome =
                        self.what_if_start(orchestration, step, ProcessType::Connect, params);
                    return Ok(outcome);
                }
                let c = self
                    .api
                    .run_connect_batch(&step.name, filter.as_deref(), codes)?;
                (ProcessType::Connect, c)
            }
            StepProcess::Matching { process_action, .. } => {
                if self.what_if {
                    let outcome =
                        self.what_if_start(orchestration, step, ProcessType::Matching, params);
                    return Ok(outcome);
                }
                let c = self
                    .api
                    .process_matching_actions(&step.name, *process_action)?;
                (ProcessType::Matching, c)
            }
        };

        // Only a plain 200 counts as started.
        if !response.is_ok() {
            let message = format!(
                "Error starting {kind} process '{}'. StatusCode={}, Response={}",
                step.name, response.status, response.raw
            );
            self.log(orchestration, Some(&step.code), LogLevel::Error, &message);
            return Ok(StartOutcome {
                started: false,
                status: Some(response.status),
                message,
                response: response.raw,
            });
        }

        let message = format!("Started {kind} process '{}'.", step.name);
        self.log(orchestration, Some(&step.code), LogLevel::Information, &message);
        Ok(StartOutcome {
            started: true,
            status: Some(response.status),
            message,
            response: response.raw,
        })
    }

    fn what_if_start(
        &self,
        orchestration: &str,
        step: &OrchestrationStep,
        kind: ProcessType,
        params: &StepParameters,
    ) -> StartOutcome {
        let message = format!(
            "WhatIf: Starting {kind} process '{}' with parameters '{}'",
            step.name, params.raw
        );
        self.log(orchestration, Some(&step.code), LogLevel::Information, &message);
        StartOutcome {
            started: true,
            status: None,
            message,
            response: Value::Null,
        }
    }

    fn wait(
        &self,
        orchestration: &str,
        step: &OrchestrationStep,
        params: &StepParameters,
        since: DateTime<Utc>,
    ) -> Result<WaitOutcome> {
        if self.what_if {
            self.log(
                orchestration,
                Some(&step.code),
                LogLevel::Information,
                &format!(
                    "WhatIf: Waiting for completion of {} process '{}'",
                    step.process_type, step.name
                ),
            );
            return Ok(WaitOutcome::skipped());
        }

        let request = PollRequest {
            strategy: &step.name,
            service: &step.process_type,
            activity_type: params.process.activity_type().unwrap_or_default(),
            since,
        };
        let outcome = poller::wait_for_completion(
            self.api,
            self.sleeper.as_ref(),
            self.settings.polling_interval(),
            self.settings.poll_timeout(),
            &request,
        )?;

        if outcome.successful {
            self.log(
                orchestration,
                Some(&step.code),
                LogLevel::Information,
                &format!(
                    "{} process '{}' completed in {:.0}s.",
                    step.process_type, step.name, outcome.elapsed_secs
                ),
            );
        } else {
            self.log(
                orchestration,
                Some(&step.code),
                LogLevel::Error,
                &format!(
                    "{} process '{}' finished with status: {}",
                    step.process_type,
                    step.name,
                    outcome.statuses()
                ),
            );
        }
        Ok(outcome)
    }

    /// Run `f` between `Entering`/`Exiting` debug records. An `Err` is
    /// logged as an exception and passed back to the caller.
    fn traced<T: Serialize>(
        &self,
        orchestration: &str,
        step: &str,
        op: &str,
        f: impl FnOnce() -> Result<T>,
    ) -> Result<T> {
        self.log(orchestration, Some(step), LogLevel::Debug, &format!("Entering {op}"));
        match f() {
            Ok(value) => {
                if LogLevel::Debug.passes(self.settings.min_log_level) {
                    let json = serde_json::to_string(&value)
                        .unwrap_or_else(|e| format!("<unserializable: {e}>"));
                    self.log(
                        orchestration,
                        Some(step),
                        LogLevel::Debug,
                        &format!("Exiting {op} => {json}"),
                    );
                }
                Ok(value)
            }
            Err(e) => {
                self.log(
                    orchestration,
                    Some(step),
                    LogLevel::Error,
                    &format!("Exception in {op}: {e}"),
                );
                Err(e)
            }
        }
    }
}
