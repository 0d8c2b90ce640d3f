//! In-memory platform used by the orchestrator tests.

use crate::classifier::{Classification, Classifier};
use crate::client::{operation, MdmApi};
use crate::error::{MdmError, Result};
use crate::model::{ORCHESTRATION_ENTITY, ORCHESTRATION_LOG_ENTITY, ORCHESTRATION_STEP_ENTITY};
use crate::query::Query;
use crate::types::ProcessAction;
use serde_json::{json, Value};
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet, VecDeque};

#[derive(Default)]
pub struct FakeApi {
    classifier: Classifier,
    orchestrations: RefCell<HashMap<String, Value>>,
    steps: RefCell<Vec<Value>>,
    start_status: RefCell<HashMap<String, u16>>,
    final_status: RefCell<HashMap<String, String>>,
    unreachable: RefCell<HashSet<String>>,
    monitor_script: RefCell<VecDeque<Option<Value>>>,
    started: RefCell<Vec<String>>,
    calls: RefCell<Vec<String>>,
    monitor_filters: RefCell<Vec<String>>,
    logs: RefCell<Vec<Value>>,
    fail_logs: Cell<bool>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_orchestration(self, record: Value) -> Self {
        let code = record["Code"].as_str().unwrap_or_default().to_string();
        self.orchestrations.borrow_mut().insert(code, record);
        self
    }

    pub fn with_step(self, record: Value) -> Self {
        self.steps.borrow_mut().push(record);
        self
    }

    /// Status returned when starting `strategy`; defaults to 200.
    pub fn start_returns(self, strategy: &str, status: u16) -> Self {
        self.start_status.borrow_mut().insert(strategy.to_string(), status);
        self
    }

    /// Monitor status reported for `strategy` once started; defaults to `Succeeded`.
    pub fn finishes_with(self, strategy: &str, status: &str) -> Self {
        self.final_status
            .borrow_mut()
            .insert(strategy.to_string(), status.to_string());
        self
    }

    /// Starting `strategy` fails at the transport level.
    pub fn unreachable(self, strategy: &str) -> Self {
        self.unreachable.borrow_mut().insert(strategy.to_string());
        self
    }

    /// Queue one scripted monitor response. `None` simulates a failed query.
    pub fn script_monitor(self, activities: Option<Value>) -> Self {
        self.monitor_script.borrow_mut().push_back(activities);
        self
    }

    pub fn fail_log_writes(&self) {
        self.fail_logs.set(true);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn job_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| {
                c.starts_with(operation::RUN_CONNECT_BATCH)
                    || c.starts_with(operation::PROCESS_MATCHING_ACTIONS)
            })
            .collect()
    }

    pub fn monitor_filters(&self) -> Vec<String> {
        self.monitor_filters.borrow().clone()
    }

    pub fn logs(&self) -> Vec<Value> {
        self.logs.borrow().clone()
    }

    pub fn log_messages(&self) -> Vec<String> {
        self.logs()
            .iter()
            .filter_map(|l| l["Message"].as_str().map(str::to_string))
            .collect()
    }

    fn respond(&self, op: &str, status: u16, body: Value) -> Result<Classification> {
        let text = if body.is_null() { String::new() } else { body.to_string() };
        Ok(self.classifier.classify(op, status, &text))
    }

    fn start(&self, op: &str, call: String, strategy: &str) -> Result<Classification> {
        self.calls.borrow_mut().push(call);
        if self.unreachable.borrow().contains(strategy) {
            return Err(MdmError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "connection refused",
            )));
        }
        let status = self.start_status.borrow().get(strategy).copied().unwrap_or(200);
        if status == 200 {
            self.started.borrow_mut().push(strategy.to_string());
            self.respond(op, status, json!({ "data": { "strategy": strategy } }))
        } else {
            self.respond(op, status, json!({ "message": "rejected" }))
        }
    }
}

fn code_from_filter(filter: &str) -> Option<String> {
    filter
        .strip_prefix("[Code] eq '")
        .and_then(|rest| rest.strip_suffix('\''))
        .map(|code| code.replace("''", "'"))
}

impl MdmApi for FakeApi {
    fn get_entities(&self) -> Result<Classification> {
        self.calls.borrow_mut().push(operation::GET_ENTITIES.to_string());
        self.respond(
            operation::GET_ENTITIES,
            200,
            json!({ "data": [{ "Name": ORCHESTRATION_ENTITY }], "TotalRecords": 1 }),
        )
    }

    fn get_records(&self, entity: &str, query: &Query) -> Result<Classification> {
        let filter = query.filter.clone().unwrap_or_default();
        self.calls
            .borrow_mut()
            .push(format!("{}:{entity}:{filter}", operation::GET_RECORDS));
        let data = match entity {
            ORCHESTRATION_ENTITY => code_from_filter(&filter)
                .and_then(|code| self.orchestrations.borrow().get(&code).cloned())
                .into_iter()
                .collect::<Vec<_>>(),
            ORCHESTRATION_STEP_ENTITY => self.steps.borrow().clone(),
            _ => Vec::new(),
        };
        self.respond(operation::GET_RECORDS, 200, json!({ "data": data }))
    }

    fn merge_records(&self, entity: &str, records: &[Value]) -> Result<Classification> {
        if entity == ORCHESTRATION_LOG_ENTITY {
            if self.fail_logs.get() {
                return self.respond(operation::MERGE_RECORDS, 500, Value::Null);
            }
            self.logs.borrow_mut().extend(records.iter().cloned());
        } else {
            self.calls
                .borrow_mut()
                .push(format!("{}:{entity}", operation::MERGE_RECORDS));
        }
        self.respond(operation::MERGE_RECORDS, 200, json!({ "data": [] }))
    }

    fn run_connect_batch(
        &self,
        strategy: &str,
        filter: Option<&str>,
        codes: &[String],
    ) -> Result<Classification> {
        let call = format!(
            "{}:{strategy}:{}:{}",
            operation::RUN_CONNECT_BATCH,
            filter.unwrap_or(""),
            codes.join(",")
        );
        self.start(operation::RUN_CONNECT_BATCH, call, strategy)
    }

    fn process_matching_actions(
        &self,
        strategy: &str,
        action: ProcessAction,
    ) -> Result<Classification> {
        let call = format!("{}:{strategy}:{action}", operation::PROCESS_MATCHING_ACTIONS);
        self.start(operation::PROCESS_MATCHING_ACTIONS, call, strategy)
    }

    fn get_monitor_activities(&self, query: Option<&Query>) -> Result<Classification> {
        self.calls
            .borrow_mut()
            .push(operation::GET_MONITOR_ACTIVITIES.to_string());
        if let Some(filter) = query.and_then(|q| q.filter.clone()) {
            self.monitor_filters.borrow_mut().push(filter);
        }

        if let Some(scripted) = self.monitor_script.borrow_mut().pop_front() {
            return match scripted {
                Some(activities) => self.respond(
                    operation::GET_MONITOR_ACTIVITIES,
                    200,
                    json!({ "data": activities }),
                ),
                None => self.respond(operation::GET_MONITOR_ACTIVITIES, 500, Value::Null),
            };
        }

        let final_status = self.final_status.borrow();
        let activities: Vec<Value> = self
            .started
            .borrow()
            .iter()
            .map(|name| {
                let status = final_status
                    .get(name)
                    .map(String::as_str)
                    .unwrap_or("Succeeded");
                json!({ "Name": format!("{name} batch"), "Status": status })
            })
            .collect();
        self.respond(operation::GET_MONITOR_ACTIVITIES, 200, json!({ "data": activities }))
    }
}
