use crate::classifier::{Classification, Classifier};
use crate::error::{MdmError, Result};
use crate::query::Query;
use crate::settings::Connection;
use crate::types::{MatchingStatus, ProcessAction};
use reqwest::blocking::Client;
use reqwest::Method;
use serde_json::{json, Value};
use std::time::Duration;

/// Operation names used to select response rules.
pub mod operation {
    pub const GET_ENTITIES: &str = "GetEntities";
    pub const GET_RECORDS: &str = "GetRecords";
    pub const MERGE_RECORDS: &str = "MergeRecords";
    pub const DELETE_RECORDS: &str = "DeleteRecords";
    pub const RUN_CONNECT_BATCH: &str = "RunConnectBatch";
    pub const PROCESS_MATCHING_ACTIONS: &str = "ProcessMatchingActions";
    pub const UNMATCH_RECORDS: &str = "UnmatchRecords";
    pub const UPDATE_MATCHING_STRATEGY: &str = "UpdateMatchingStrategy";
    pub const GET_MONITOR_ACTIVITIES: &str = "GetMonitorActivities";
}

const API_KEY_HEADER: &str = "x-api-key";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

// ---------------------------------------------------------------------------
// MdmApi
// ---------------------------------------------------------------------------

/// The platform operations the orchestrator depends on.
///
/// `Err` means the call could not be made or its body could not be read.
/// HTTP error statuses come back as `Ok` with an error classification.
pub trait MdmApi {
    fn get_entities(&self) -> Result<Classification>;
    fn get_records(&self, entity: &str, query: &Query) -> Result<Classification>;
    fn merge_records(&self, entity: &str, records: &[Value]) -> Result<Classification>;
    fn run_connect_batch(
        &self,
        strategy: &str,
        filter: Option<&str>,
        codes: &[String],
    ) -> Result<Classification>;
    fn process_matching_actions(
        &self,
        strategy: &str,
        action: ProcessAction,
    ) -> Result<Classification>;
    fn get_monitor_activities(&self, query: Option<&Query>) -> Result<Classification>;

    /// First record whose code matches, if the query succeeded.
    fn get_record(&self, entity: &str, code: &str) -> Result<Option<Value>> {
        let c = self.get_records(entity, &Query::by_code(code))?;
        if !c.is_success() {
            return Err(remote_error(&c));
        }
        Ok(c.data().as_array().and_then(|a| a.first()).cloned())
    }

    fn merge_record(&self, entity: &str, record: Value) -> Result<Classification> {
        self.merge_records(entity, std::slice::from_ref(&record))
    }
}

/// Turn a non-success classification into an error value.
pub fn remote_error(c: &Classification) -> MdmError {
    MdmError::Remote {
        operation: c.operation.clone(),
        status: c.status,
        message: c
            .result
            .message()
            .map(str::to_string)
            .unwrap_or_else(|| c.raw.to_string()),
    }
}

// ---------------------------------------------------------------------------
// RestClient
// ---------------------------------------------------------------------------

pub struct RestClient {
    base_url: String,
    client_id: String,
    http: Client,
    classifier: Classifier,
}

impl RestClient {
    pub fn new(connection: &Connection) -> Result<Self> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            base_url: connection.url.trim_end_matches('/').to_string(),
            client_id: connection.client_id.clone(),
            http,
            classifier: Classifier::default(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Issue one request and classify whatever comes back.
    fn call(
        &self,
        operation: &str,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<Classification> {
        let url = self.url(path);
        tracing::debug!(operation, %method, url = %url, "calling platform");

        let mut request = self
            .http
            .request(method, &url)
            .header(API_KEY_HEADER, &self.client_id);
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send()?;
        let status = response.status().as_u16();
        let text = response.text()?;
        tracing::debug!(operation, status, "platform responded");

        let classification = self.classifier.classify(operation, status, &text);
        if let Some(errors) = classification
            .errors
            .as_ref()
            .filter(|e| e.as_array().is_some_and(|a| !a.is_empty()))
        {
            tracing::debug!(operation, "platform reported errors: {errors}");
        }
        Ok(classification)
    }

    pub fn delete_records(&self, entity: &str, codes: &[String]) -> Result<Classification> {
        self.call(
            operation::DELETE_RECORDS,
            Method::DELETE,
            &format!("rest/v1/records/{entity}"),
            &[("RecordCodes", codes.join(","))],
            None,
        )
    }

    pub fn unmatch_records(&self, strategy: &str, codes: &[String]) -> Result<Classification> {
        self.call(
            operation::UNMATCH_RECORDS,
            Method::PATCH,
            &format!("rest/v1/Matching/{strategy}/unmatchRecords"),
            &[],
            Some(&json!({ "recordCodes": codes })),
        )
    }

    pub fn update_matching_strategy(
        &self,
        strategy: &str,
        status: MatchingStatus,
    ) -> Result<Classification> {
        self.call(
            operation::UPDATE_MATCHING_STRATEGY,
            Method::PATCH,
            &format!("rest/v1/Matching/{strategy}"),
            &[],
            Some(&json!({ "continuousMatchingSetting": status.value() })),
        )
    }
}

impl MdmApi for RestClient {
    fn get_entities(&self) -> Result<Classification> {
        self.call(operation::GET_ENTITIES, Method::GET, "rest/v1/entities", &[], None)
    }

    fn get_records(&self, entity: &str, query: &Query) -> Result<Classification> {
        self.call(
            operation::GET_RECORDS,
            Method::GET,
            &format!("rest/v1/records/{entity}"),
            &query.pairs(),
            None,
        )
    }

    fn merge_records(&self, entity: &str, records: &[Value]) -> Result<Classification> {
        self.call(
            operation::MERGE_RECORDS,
            Method::PATCH,
            &format!("rest/v1/records/{entity}"),
            &[],
            Some(&Value::Array(records.to_vec())),
        )
    }

    fn run_connect_batch(
        &self,
        strategy: &str,
        filter: Option<&str>,
        codes: &[String],
    ) -> Result<Classification> {
        let body = json!({
            "FilterExpression": filter.unwrap_or(""),
            "Codes": codes,
        });
        self.call(
            operation::RUN_CONNECT_BATCH,
            Method::POST,
            &format!("rest/v1/Connect/strategies/{strategy}/Batch"),
            &[],
            Some(&body),
        )
    }

    fn process_matching_actions(
        &self,
        strategy: &str,
        action: ProcessAction,
    ) -> Result<Classification> {
        let body = json!({ "Actions": action.actions() });
        self.call(
            operation::PROCESS_MATCHING_ACTIONS,
            Method::POST,
            &format!("rest/v1/Matching/{strategy}/processActions"),
            &[],
            Some(&body),
        )
    }

    fn get_monitor_activities(&self, query: Option<&Query>) -> Result<Classification> {
        let default_query;
        let query = match query {
            Some(q) => q,
            None => {
                default_query = Query::default().order_by("[StartedTime] desc");
                &default_query
            }
        };
        self.call(
            operation::GET_MONITOR_ACTIVITIES,
            Method::GET,
            "rest/v1/Monitor/activities",
            &query.pairs(),
            None,
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
