use crate::rules::default_rules;
use serde::Serialize;
use serde_json::Value;

// ---------------------------------------------------------------------------
// ResponseContext
// ---------------------------------------------------------------------------

pub struct ResponseContext<'a> {
    pub operation: &'a str,
    pub status: u16,
    pub body: &'a Value,
}

// ---------------------------------------------------------------------------
// ApiResult (normalized output)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ApiResult {
    /// Success carrying the payload (the body's `data` field when present).
    Data { data: Value },
    /// Success with a fixed message and no payload.
    Message { status: u16, message: String },
    /// A status the platform documents as an error.
    Error {
        status: u16,
        message: String,
        details: Value,
    },
    /// No rule covers this (operation, status) pair.
    Unhandled { status: u16, message: String },
}

impl ApiResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ApiResult::Data { .. } | ApiResult::Message { .. })
    }

    pub fn data(&self) -> Option<&Value> {
        match self {
            ApiResult::Data { data } => Some(data),
            _ => None,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            ApiResult::Message { message, .. }
            | ApiResult::Error { message, .. }
            | ApiResult::Unhandled { message, .. } => Some(message),
            ApiResult::Data { .. } => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Everything learned from one response. Returned to the caller instead of
/// being stored on the client, so consecutive calls never share state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub operation: String,
    pub status: u16,
    /// Parsed body: `null` when empty, a JSON string when not valid JSON.
    pub raw: Value,
    /// Platform-reported error list, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Value>,
    pub result: ApiResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<&'static str>,
}

impl Classification {
    pub fn is_success(&self) -> bool {
        self.result.is_success()
    }

    /// The job-start endpoints only count a plain 200 as started.
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }

    /// `data` payload, or `null` for non-data results.
    pub fn data(&self) -> &Value {
        self.result.data().unwrap_or(&Value::Null)
    }
}

// ---------------------------------------------------------------------------
// Rule
// ---------------------------------------------------------------------------

/// Output of a rule handler: the normalized result plus the error list it
/// extracted from the body.
pub struct Handled {
    pub result: ApiResult,
    pub errors: Option<Value>,
}

/// A fn-pointer rule keyed by (operation, status). `operation: None`
/// matches every operation.
pub struct Rule {
    pub id: &'static str,
    pub operation: Option<&'static str>,
    pub status: u16,
    pub message: &'static str,
    pub handler: fn(&ResponseContext, &'static str) -> Handled,
}

// ---------------------------------------------------------------------------
// Classifier
// ---------------------------------------------------------------------------

pub struct Classifier {
    rules: Vec<Rule>,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(default_rules())
    }
}

impl Classifier {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// Exact (operation, status) rules win over wildcard rules regardless of
    /// their position in the table.
    pub fn find_rule(&self, operation: &str, status: u16) -> Option<&Rule> {
        self.rules
            .iter()
            .find(|r| r.status == status && r.operation == Some(operation))
            .or_else(|| {
                self.rules
                    .iter()
                    .find(|r| r.status == status && r.operation.is_none())
            })
    }

    pub fn classify(&self, operation: &str, status: u16, body: &str) -> Classification {
        let raw = parse_body(body);
        let ctx = ResponseContext {
            operation,
            status,
            body: &raw,
        };

        let (handled, rule_id) = match self.find_rule(operation, status) {
            Some(rule) => ((rule.handler)(&ctx, rule.message), Some(rule.id)),
            None => (
                Handled {
                    result: ApiResult::Unhandled {
                        status,
                        message: format!(
                            "ResponseHandler not found for ('{operation}', {status})."
                        ),
                    },
                    errors: None,
                },
                None,
            ),
        };

        tracing::trace!(operation, status, rule = ?rule_id, "classified response");

        Classification {
            operation: operation.to_string(),
            status,
            errors: handled.errors,
            result: handled.result,
            raw,
            rule_id,
        }
    }
}

fn parse_body(body: &str) -> Value {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }
    serde_json::from_str(trimmed).unwrap_or_else(|_| Value::String(body.to_string()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
