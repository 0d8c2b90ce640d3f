use crate::client::MdmApi;
use crate::error::{MdmError, Result};
use crate::model::MonitorActivity;
use crate::query::{escape_literal, Query};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::{Duration, Instant};

/// Blocks between monitor polls.
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// What to wait for.
pub struct PollRequest<'a> {
    /// Strategy name; activities are matched by a case-insensitive substring.
    pub strategy: &'a str,
    /// Stored process type, used verbatim as the `Service` filter.
    pub service: &'a str,
    pub activity_type: &'a str,
    pub since: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WaitOutcome {
    pub successful: bool,
    pub activities: Vec<MonitorActivity>,
    pub first_seen: Option<DateTime<Utc>>,
    pub elapsed_secs: f64,
    pub polls: u32,
}

impl WaitOutcome {
    pub fn skipped() -> Self {
        Self {
            successful: true,
            activities: Vec::new(),
            first_seen: None,
            elapsed_secs: 0.0,
            polls: 0,
        }
    }

    /// `name=status` pairs, for failure messages.
    pub fn statuses(&self) -> String {
        self.activities
            .iter()
            .map(|a| format!("{}={}", a.name, a.status))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

pub fn monitor_filter(activity_type: &str, service: &str, since: DateTime<Utc>) -> String {
    format!(
        "[ActivityType] eq '{}' and [Service] eq '{}' and [StartedTime] gt {}",
        escape_literal(activity_type),
        escape_literal(service),
        since.format("%Y-%m-%dT%H:%M:%SZ")
    )
}

/// Poll the monitor until every matching activity has left `Running`.
///
/// Returns `MdmError::PollTimeout` once `timeout` has elapsed without
/// completion. With no timeout the wait is unbounded.
pub fn wait_for_completion<A: MdmApi>(
    api: &A,
    sleeper: &dyn Sleeper,
    interval: Duration,
    timeout: Option<Duration>,
    request: &PollRequest<'_>,
) -> Result<WaitOutcome> {
    let query = Query::filter(monitor_filter(
        request.activity_type,
        request.service,
        request.since,
    ))
    .order_by("[StartedTime] desc");
    let started = Instant::now();
    let mut first_seen = None;
    let mut polls = 0;

    loop {
        polls += 1;
        let activities: Vec<MonitorActivity> = match api.get_monitor_activities(Some(&query)) {
            Ok(c) if c.is_success() => MonitorActivity::list_from(c.data())
                .into_iter()
                .filter(|a| a.name_contains(request.strategy))
                .collect(),
            Ok(c) => {
                tracing::debug!(
                    status = c.status,
                    "monitor query failed, treating as no activities"
                );
                Vec::new()
            }
            Err(e) => {
                tracing::debug!("monitor query failed, treating as no activities: {e}");
                Vec::new()
            }
        };

        if !activities.is_empty() && first_seen.is_none() {
            first_seen = Some(Utc::now());
        }

        if !activities.is_empty() && activities.iter().all(|a| !a.status.is_running()) {
            let successful = activities.iter().all(|a| a.status.is_succeeded());
            return Ok(WaitOutcome {
                successful,
                activities,
                first_seen,
                elapsed_secs: started.elapsed().as_secs_f64(),
                polls,
            });
        }

        if let Some(limit) = timeout {
            if started.elapsed() >= limit {
                return Err(MdmError::PollTimeout {
                    strategy: request.strategy.to_string(),
                    elapsed_secs: started.elapsed().as_secs(),
                });
            }
        }

        tracing::trace!(
            strategy = request.strategy,
            active = activities.len(),
            "waiting {}s before polling again",
            interval.as_secs()
        );
        sleeper.sleep(interval);
    }
}
