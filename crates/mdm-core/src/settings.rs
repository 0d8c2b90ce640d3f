use crate::error::{MdmError, Result};
use crate::model::field;
use crate::types::LogLevel;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_SETTINGS_FILE: &str = "settings.json";

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(
        rename = "PlatformUrl",
        alias = "ProfiseeUrl",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub platform_url: Option<String>,
    #[serde(rename = "ClientId", default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(rename = "MinLogLevel", default)]
    pub min_log_level: LogLevel,
    /// Seconds between monitor queries while a job is running.
    #[serde(
        rename = "ActivityPollingInterval",
        default = "default_polling_interval"
    )]
    pub activity_polling_interval: u64,
    /// Seconds before the poller gives up. `None` waits forever.
    #[serde(rename = "PollTimeout", default, skip_serializing_if = "Option::is_none")]
    pub poll_timeout: Option<u64>,
}

fn default_polling_interval() -> u64 {
    15
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            platform_url: None,
            client_id: None,
            min_log_level: LogLevel::default(),
            activity_polling_interval: default_polling_interval(),
            poll_timeout: None,
        }
    }
}

/// Platform URL and API key, both present and non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub url: String,
    pub client_id: String,
}

impl Settings {
    /// Load settings from a JSON file. A missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!(
                "No settings file found at {}, using defaults.",
                path.display()
            );
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path)?;
        Self::parse(&data)
            .map_err(|e| MdmError::Config(format!("invalid settings file {}: {e}", path.display())))
    }

    pub fn parse(data: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(data)
    }

    /// Non-empty command-line values replace the file's values.
    pub fn with_overrides(mut self, url: Option<String>, client_id: Option<String>) -> Self {
        if let Some(url) = url.filter(|u| !u.trim().is_empty()) {
            self.platform_url = Some(url);
        }
        if let Some(id) = client_id.filter(|c| !c.trim().is_empty()) {
            self.client_id = Some(id);
        }
        self
    }

    pub fn connection(&self) -> Result<Connection> {
        let url = self.platform_url.as_deref().map(str::trim).unwrap_or("");
        let client_id = self.client_id.as_deref().map(str::trim).unwrap_or("");
        if url.is_empty() || client_id.is_empty() {
            return Err(MdmError::Config(
                "PlatformUrl and ClientId are required.".to_string(),
            ));
        }
        Ok(Connection {
            url: url.to_string(),
            client_id: client_id.to_string(),
        })
    }

    /// Delay between monitor polls, never shorter than one second.
    pub fn polling_interval(&self) -> Duration {
        Duration::from_secs(self.activity_polling_interval.max(1))
    }

    pub fn poll_timeout(&self) -> Option<Duration> {
        self.poll_timeout.map(Duration::from_secs)
    }

    /// Apply the `Parameters` of the platform-side settings record.
    ///
    /// Keys are matched case-insensitively. Values that do not parse are
    /// ignored with a warning and the current value is kept.
    pub fn apply_platform_overrides(&mut self, params: &Value) {
        if let Some(level) = field(params, "MinLogLevel").and_then(Value::as_str) {
            match level.parse::<LogLevel>() {
                Ok(l) => self.min_log_level = l,
                Err(e) => tracing::warn!("ignoring platform setting MinLogLevel: {e}"),
            }
        }
        if let Some(v) = field(params, "ActivityPollingInterval") {
            match as_seconds(v) {
                Some(secs) if secs > 0 => self.activity_polling_interval = secs,
                _ => tracing::warn!("ignoring platform setting ActivityPollingInterval={v}"),
            }
        }
        if let Some(v) = field(params, "PollTimeout") {
            match as_seconds(v) {
                Some(secs) => self.poll_timeout = Some(secs),
                None => tracing::warn!("ignoring platform setting PollTimeout={v}"),
            }
        }
    }
}

fn as_seconds(v: &Value) -> Option<u64> {
    match v {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
