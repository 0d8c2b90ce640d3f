use crate::client::MdmApi;
use crate::model::{OrchestrationLog, ORCHESTRATION_LOG_ENTITY};
use crate::types::LogLevel;

/// Sends orchestration events to the process log and to the platform's
/// `OrchestrationLog` entity.
///
/// Events below `min_level` are dropped before either write. The platform
/// write is fire-and-forget: a failure is reported locally and not retried.
pub struct LogSink<'a, A: MdmApi> {
    api: &'a A,
    min_level: LogLevel,
}

impl<'a, A: MdmApi> LogSink<'a, A> {
    pub fn new(api: &'a A, min_level: LogLevel) -> Self {
        Self { api, min_level }
    }

    pub fn min_level(&self) -> LogLevel {
        self.min_level
    }

    /// Returns `true` if the event passed the threshold.
    pub fn log(
        &self,
        orchestration: &str,
        step: Option<&str>,
        level: LogLevel,
        message: &str,
    ) -> bool {
        if !level.passes(self.min_level) {
            return false;
        }

        forward(orchestration, step, level, message);

        let record = OrchestrationLog {
            orchestration: orchestration.to_string(),
            step: step.map(str::to_string),
            level,
            message: message.to_string(),
        }
        .to_record();

        match self.api.merge_record(ORCHESTRATION_LOG_ENTITY, record) {
            Ok(c) if c.is_success() => {}
            Ok(c) => tracing::warn!(
                status = c.status,
                "failed to write orchestration log record: {}",
                c.result.message().unwrap_or("unexpected response")
            ),
            Err(e) => tracing::warn!("failed to write orchestration log record: {e}"),
        }
        true
    }
}

fn forward(orchestration: &str, step: Option<&str>, level: LogLevel, message: &str) {
    let step = step.unwrap_or("-");
    match level {
        LogLevel::Trace => tracing::trace!(orchestration, step, "{message}"),
        LogLevel::Debug => tracing::debug!(orchestration, step, "{message}"),
        LogLevel::Information => tracing::info!(orchestration, step, "{message}"),
        LogLevel::Warning => tracing::warn!(orchestration, step, "{message}"),
        LogLevel::Error | LogLevel::Critical => {
            tracing::error!(orchestration, step, "{message}")
        }
        LogLevel::None => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::fake::FakeApi;
    use serde_json::json;

    #[test]
    fn writes_record_at_or_above_threshold() {
        let api = FakeApi::new();
        let sink = LogSink::new(&api, LogLevel::Information);

        assert!(sink.log("Nightly", Some("S1"), LogLevel::Warning, "careful"));
        assert!(sink.log("Nightly", None, LogLevel::Information, "hello"));

        let logs = api.logs();
        assert_eq!(logs.len(), 2);
        assert_eq!(
            logs[0],
            json!({
                "Orchestration": "Nightly",
                "OrchestrationStep": "S1",
                "LogLevel": "Warning",
                "Message": "careful"
            })
        );
        assert_eq!(logs[1]["OrchestrationStep"], json!(null));
    }

    #[test]
    fn drops_events_below_threshold() {
        let api = FakeApi::new();
        let sink = LogSink::new(&api, LogLevel::Warning);

        assert!(!sink.log("Nightly", None, LogLevel::Debug, "noise"));
        assert!(!sink.log("Nightly", None, LogLevel::Information, "noise"));
        assert!(api.logs().is_empty());
    }

    #[test]
    fn failed_platform_write_does_not_panic() {
        let api = FakeApi::new();
        api.fail_log_writes();
        let sink = LogSink::new(&api, LogLevel::Trace);

        assert!(sink.log("Nightly", None, LogLevel::Error, "boom"));
        assert!(api.logs().is_empty());
    }
}
