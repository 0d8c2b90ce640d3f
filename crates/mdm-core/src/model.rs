//! Records the orchestrator reads from and writes to the platform.
//!
//! The platform returns records as loosely-typed JSON objects whose
//! attribute names are matched case-insensitively. Each record type here
//! parses that shape once so the orchestrator works with typed fields.

use crate::error::{MdmError, Result};
use crate::types::{
    ActivityStatus, ErrorHandling, ExecutionMode, LogLevel, ProcessAction, ProcessType,
};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use serde_json::Value;

pub const ORCHESTRATION_ENTITY: &str = "Orchestration";
pub const ORCHESTRATION_STEP_ENTITY: &str = "OrchestrationStep";
pub const ORCHESTRATION_LOG_ENTITY: &str = "OrchestrationLog";
/// Code of the `Orchestration` record holding platform-side settings.
pub const SETTINGS_RECORD_CODE: &str = "z_Settings";

// ---------------------------------------------------------------------------
// Field helpers
// ---------------------------------------------------------------------------

/// Look up an object field by name, ignoring ASCII case.
pub fn field<'a>(value: &'a Value, name: &str) -> Option<&'a Value> {
    let obj = value.as_object()?;
    obj.get(name).or_else(|| {
        obj.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    })
}

pub fn field_str<'a>(value: &'a Value, name: &str) -> Option<&'a str> {
    field(value, name).and_then(Value::as_str)
}

/// Field rendered as text: strings as-is, numbers and bools formatted,
/// `null` and missing as `None`.
pub fn field_text(value: &Value, name: &str) -> Option<String> {
    match field(value, name)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Parse a `Parameters` attribute. Empty text is an empty object.
pub fn parse_parameters(code: &str, text: &str) -> Result<Value> {
    if text.trim().is_empty() {
        return Ok(Value::Object(Default::default()));
    }
    let value: Value = serde_json::from_str(text).map_err(|e| MdmError::InvalidParameters {
        code: code.to_string(),
        reason: e.to_string(),
    })?;
    if !value.is_object() {
        return Err(MdmError::InvalidParameters {
            code: code.to_string(),
            reason: "parameters must be a JSON object".to_string(),
        });
    }
    Ok(value)
}

// ---------------------------------------------------------------------------
// Orchestration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Orchestration {
    pub code: String,
    pub name: Option<String>,
    pub mode: ExecutionMode,
    pub error_handling: ErrorHandling,
    pub parameters: Value,
    /// `Parameters` exactly as stored, for log messages.
    pub parameters_text: String,
}

impl Orchestration {
    pub fn from_record(record: &Value) -> Result<Self> {
        let code = field_text(record, "Code").ok_or_else(|| MdmError::InvalidParameters {
            code: "<unknown>".to_string(),
            reason: "orchestration record has no Code".to_string(),
        })?;
        let parameters_text = field_text(record, "Parameters").unwrap_or_else(|| "{}".to_string());
        let parameters = parse_parameters(&code, &parameters_text)?;
        let mode = ExecutionMode::parse(&field_text(record, "Mode").unwrap_or_default());
        let error_handling = ErrorHandling::parse(
            &field_text(record, "ErrorHandling").unwrap_or_else(|| "Abort".to_string()),
        );
        Ok(Self {
            name: field_text(record, "Name"),
            code,
            mode,
            error_handling,
            parameters,
            parameters_text,
        })
    }
}

// ---------------------------------------------------------------------------
// OrchestrationStep
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrchestrationStep {
    pub code: String,
    /// Display name; doubles as the strategy name on the platform.
    pub name: String,
    pub step_number: i64,
    /// Stored process type, kept verbatim for the monitor `Service` filter.
    pub process_type: String,
    pub parameters_text: String,
}

impl OrchestrationStep {
    pub fn from_record(record: &Value) -> Self {
        let step_number = match field(record, "StepNumber") {
            Some(Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64))
                .unwrap_or(0),
            Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
            _ => 0,
        };
        Self {
            code: field_text(record, "Code").unwrap_or_default(),
            name: field_text(record, "Name").unwrap_or_default(),
            step_number,
            process_type: field_text(record, "ProcessType").unwrap_or_default(),
            parameters_text: field_text(record, "Parameters").unwrap_or_else(|| "{}".to_string()),
        }
    }

    /// Typed parameters for this step's process type.
    ///
    /// A step without a `Name` has no strategy to start or monitor, so it
    /// is rejected as invalid.
    pub fn parameters(&self) -> Result<StepParameters> {
        if self.name.trim().is_empty() {
            return Err(MdmError::InvalidParameters {
                code: self.code.clone(),
                reason: "step has no Name (strategy name)".to_string(),
            });
        }
        StepParameters::parse(&self.code, &self.process_type, &self.parameters_text)
    }
}

// ---------------------------------------------------------------------------
// StepParameters
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum StepProcess {
    Connect {
        filter: Option<String>,
        codes: Vec<String>,
        activity_type: String,
    },
    Matching {
        process_action: ProcessAction,
        activity_type: String,
    },
    Unknown { process_type: String },
}

impl StepProcess {
    pub fn process_type(&self) -> Option<ProcessType> {
        match self {
            StepProcess::Connect { .. } => Some(ProcessType::Connect),
            StepProcess::Matching { .. } => Some(ProcessType::Matching),
            StepProcess::Unknown { .. } => None,
        }
    }

    pub fn activity_type(&self) -> Option<&str> {
        match self {
            StepProcess::Connect { activity_type, .. }
            | StepProcess::Matching { activity_type, .. } => Some(activity_type),
            StepProcess::Unknown { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepParameters {
    pub enabled: bool,
    pub process: StepProcess,
    /// The parsed object, echoed into results and log messages.
    pub raw: Value,
}

impl StepParameters {
    pub fn parse(code: &str, process_type: &str, text: &str) -> Result<Self> {
        let raw = parse_parameters(code, text)?;
        let enabled = field(&raw, "Enabled").and_then(Value::as_bool).unwrap_or(true);
        let activity_type = |pt: ProcessType| {
            field_str(&raw, "ActivityType")
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(pt.default_activity_type())
                .to_string()
        };

        let process = match ProcessType::parse(process_type) {
            Some(ProcessType::Connect) => StepProcess::Connect {
                filter: field_str(&raw, "Filter")
                    .filter(|s| !s.is_empty())
                    .map(str::to_string),
                codes: field(&raw, "Codes")
                    .and_then(Value::as_array)
                    .map(|a| {
                        a.iter()
                            .filter_map(Value::as_str)
                            .map(str::to_string)
                            .collect()
                    })
                    .unwrap_or_default(),
                activity_type: activity_type(ProcessType::Connect),
            },
            Some(ProcessType::Matching) => {
                let process_action = match field_str(&raw, "ProcessAction") {
                    None => ProcessAction::default(),
                    Some(s) => ProcessAction::parse(s).unwrap_or_else(|| {
                        tracing::warn!(
                            "step '{code}': unknown ProcessAction '{s}', using MatchingOnly"
                        );
                        ProcessAction::default()
                    }),
                };
                StepProcess::Matching {
                    process_action,
                    activity_type: activity_type(ProcessType::Matching),
                }
            }
            None => StepProcess::Unknown {
                process_type: process_type.to_string(),
            },
        };

        Ok(Self {
            enabled,
            process,
            raw,
        })
    }
}

// ---------------------------------------------------------------------------
// MonitorActivity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonitorActivity {
    pub name: String,
    pub status: ActivityStatus,
    pub started: Option<DateTime<Utc>>,
    pub activity_type: Option<String>,
    pub service: Option<String>,
}

impl MonitorActivity {
    pub fn from_value(value: &Value) -> Self {
        Self {
            name: field_text(value, "Name").unwrap_or_default(),
            status: ActivityStatus::parse(
                &field_text(value, "Status").unwrap_or_else(|| "Unknown".to_string()),
            ),
            started: field_str(value, "StartedTime").and_then(parse_timestamp),
            activity_type: field_text(value, "ActivityType"),
            service: field_text(value, "Service"),
        }
    }

    /// Activities from a monitor query payload; non-array payloads are empty.
    pub fn list_from(data: &Value) -> Vec<Self> {
        data.as_array()
            .map(|a| a.iter().map(Self::from_value).collect())
            .unwrap_or_default()
    }

    pub fn name_contains(&self, strategy: &str) -> bool {
        self.name
            .to_lowercase()
            .contains(&strategy.to_lowercase())
    }
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|n| n.and_utc())
}

// ---------------------------------------------------------------------------
// OrchestrationLog
// ---------------------------------------------------------------------------

/// One audit record. Written, never read back.
#[derive(Debug, Clone, PartialEq)]
pub struct OrchestrationLog {
    pub orchestration: String,
    pub step: Option<String>,
    pub level: LogLevel,
    pub message: String,
}

impl OrchestrationLog {
    pub fn to_record(&self) -> Value {
        serde_json::json!({
            "Orchestration": self.orchestration,
            "OrchestrationStep": self.step,
            "LogLevel": self.level.as_str(),
            "Message": self.message,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
