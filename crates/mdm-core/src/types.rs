use crate::error::MdmError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

// ---------------------------------------------------------------------------
// LogLevel
// ---------------------------------------------------------------------------

/// Severity of an orchestration log event, ordered from most to least verbose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Information,
    Warning,
    Error,
    Critical,
    None,
}

impl LogLevel {
    pub fn all() -> &'static [LogLevel] {
        &[
            LogLevel::Trace,
            LogLevel::Debug,
            LogLevel::Information,
            LogLevel::Warning,
            LogLevel::Error,
            LogLevel::Critical,
            LogLevel::None,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "Trace",
            LogLevel::Debug => "Debug",
            LogLevel::Information => "Information",
            LogLevel::Warning => "Warning",
            LogLevel::Error => "Error",
            LogLevel::Critical => "Critical",
            LogLevel::None => "None",
        }
    }

    /// An event at `self` passes a threshold of `min`.
    pub fn passes(self, min: LogLevel) -> bool {
        self != LogLevel::None && self >= min
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LogLevel {
    type Err = MdmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "information" | "info" => Ok(LogLevel::Information),
            "warning" | "warn" => Ok(LogLevel::Warning),
            "error" => Ok(LogLevel::Error),
            "critical" => Ok(LogLevel::Critical),
            "none" => Ok(LogLevel::None),
            _ => Err(MdmError::InvalidLogLevel(s.to_string())),
        }
    }
}

impl Serialize for LogLevel {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for LogLevel {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(d)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// ProcessType
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProcessType {
    Connect,
    Matching,
}

impl ProcessType {
    /// Case-insensitive lookup; `None` for process types this tool cannot start.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "connect" => Some(ProcessType::Connect),
            "matching" => Some(ProcessType::Matching),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProcessType::Connect => "Connect",
            ProcessType::Matching => "Matching",
        }
    }

    /// Monitor activity type recorded by the platform for jobs of this kind.
    pub fn default_activity_type(self) -> &'static str {
        match self {
            ProcessType::Connect => "Connect Strategy Execution",
            ProcessType::Matching => "Clustering & Survivorship",
        }
    }
}

impl fmt::Display for ProcessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ProcessAction
// ---------------------------------------------------------------------------

/// What a matching job should do when triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProcessAction {
    #[default]
    MatchingOnly,
    MatchingAndSurvivorship,
    SurvivorshipOnly,
    ClearPriorResults,
    ClearAllPriorResults,
}

impl ProcessAction {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "matchingonly" => Some(ProcessAction::MatchingOnly),
            "matchingandsurvivorship" => Some(ProcessAction::MatchingAndSurvivorship),
            "survivorshiponly" => Some(ProcessAction::SurvivorshipOnly),
            "clearpriorresults" => Some(ProcessAction::ClearPriorResults),
            "clearallpriorresults" => Some(ProcessAction::ClearAllPriorResults),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProcessAction::MatchingOnly => "MatchingOnly",
            ProcessAction::MatchingAndSurvivorship => "MatchingAndSurvivorship",
            ProcessAction::SurvivorshipOnly => "SurvivorshipOnly",
            ProcessAction::ClearPriorResults => "ClearPriorResults",
            ProcessAction::ClearAllPriorResults => "ClearAllPriorResults",
        }
    }

    /// The `Actions` list sent to the processActions endpoint.
    pub fn actions(self) -> &'static [&'static str] {
        match self {
            ProcessAction::MatchingOnly => &[],
            ProcessAction::MatchingAndSurvivorship => &["IncludeSurvivorship"],
            ProcessAction::SurvivorshipOnly => &["SurvivorshipOnly"],
            ProcessAction::ClearPriorResults => &["ClearPriorResults", "ClearMatchingResults"],
            ProcessAction::ClearAllPriorResults => {
                &["ClearAllPriorResults", "ClearMatchingResults"]
            }
        }
    }
}

impl fmt::Display for ProcessAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// MatchingStatus
// ---------------------------------------------------------------------------

/// Continuous matching setting of a matching strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchingStatus {
    Disabled = 0,
    Enabled = 1,
    EnabledWithClustering = 2,
    EnabledWithClusteringAndSurvivorship = 3,
    EnabledWithSurvivorship = 4,
}

impl MatchingStatus {
    pub fn value(self) -> u8 {
        self as u8
    }
}

// ---------------------------------------------------------------------------
// ExecutionMode / ErrorHandling
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionMode {
    Sequential,
    /// Declared by the platform's data model; refused at run time.
    Concurrent,
    Other(String),
}

impl ExecutionMode {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "sequential" => ExecutionMode::Sequential,
            "concurrent" => ExecutionMode::Concurrent,
            _ => ExecutionMode::Other(s.to_string()),
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionMode::Sequential => f.write_str("Sequential"),
            ExecutionMode::Concurrent => f.write_str("Concurrent"),
            ExecutionMode::Other(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorHandling {
    Abort,
    Continue,
}

impl ErrorHandling {
    /// Only the literal `Abort` aborts; anything else keeps going.
    pub fn parse(s: &str) -> Self {
        if s == "Abort" {
            ErrorHandling::Abort
        } else {
            ErrorHandling::Continue
        }
    }

    pub fn aborts(self) -> bool {
        self == ErrorHandling::Abort
    }
}

// ---------------------------------------------------------------------------
// ActivityStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivityStatus {
    Running,
    Succeeded,
    Other(String),
}

impl ActivityStatus {
    pub fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("running") {
            ActivityStatus::Running
        } else if s.eq_ignore_ascii_case("succeeded") {
            ActivityStatus::Succeeded
        } else {
            ActivityStatus::Other(s.to_string())
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, ActivityStatus::Running)
    }

    pub fn is_succeeded(&self) -> bool {
        matches!(self, ActivityStatus::Succeeded)
    }
}

impl fmt::Display for ActivityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActivityStatus::Running => f.write_str("Running"),
            ActivityStatus::Succeeded => f.write_str("Succeeded"),
            ActivityStatus::Other(s) => f.write_str(s),
        }
    }
}

impl Serialize for ActivityStatus {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
