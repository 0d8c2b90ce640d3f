use crate::classifier::{ApiResult, Handled, ResponseContext, Rule};
use crate::model::field;
use serde_json::Value;

// ---------------------------------------------------------------------------
// Helper macro for concise rule definitions
// ---------------------------------------------------------------------------

macro_rules! rule {
    (
        id: $id:expr,
        $(operation: $op:expr,)?
        status: $status:expr,
        handler: $handler:expr
        $(, message: $msg:expr)?
    ) => {
        Rule {
            id: $id,
            operation: {
                #[allow(unused_assignments, unused_mut)]
                let mut v: Option<&'static str> = None;
                $(v = Some($op);)?
                v
            },
            status: $status,
            message: {
                #[allow(unused_assignments, unused_mut)]
                let mut v: &'static str = "";
                $(v = $msg;)?
                v
            },
            handler: $handler,
        }
    };
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Success without a payload: report the rule's fixed message.
pub fn success_handler(ctx: &ResponseContext, message: &'static str) -> Handled {
    Handled {
        result: ApiResult::Message {
            status: ctx.status,
            message: message.to_string(),
        },
        errors: None,
    }
}

/// Success with a payload: the body's `data` field, or the whole body.
pub fn success_data_handler(ctx: &ResponseContext, _message: &'static str) -> Handled {
    let data = field(ctx.body, "data")
        .filter(|d| !d.is_null())
        .unwrap_or(ctx.body)
        .clone();
    Handled {
        result: ApiResult::Data { data },
        errors: field(ctx.body, "errors").cloned(),
    }
}

/// Documented error status: the whole body becomes the error details.
pub fn error_handler(ctx: &ResponseContext, message: &'static str) -> Handled {
    let details = ctx.body.clone();
    let errors = match &details {
        Value::Null => None,
        other => Some(other.clone()),
    };
    Handled {
        result: ApiResult::Error {
            status: ctx.status,
            message: message.to_string(),
            details,
        },
        errors,
    }
}

// ---------------------------------------------------------------------------
// Default rule table
// ---------------------------------------------------------------------------

pub fn default_rules() -> Vec<Rule> {
    vec![
        // -- Operation-specific ------------------------------------------------
        rule! {
            id: "unmatch_records_no_content",
            operation: "UnmatchRecords",
            status: 204,
            handler: success_handler,
            message: "Success - records unmatched."
        },
        rule! {
            id: "update_matching_strategy_no_content",
            operation: "UpdateMatchingStrategy",
            status: 204,
            handler: success_handler,
            message: "Success - Successfully updated the continuous matching setting of the matching strategy."
        },
        // -- Any operation: success ------------------------------------------
        rule! {
            id: "ok",
            status: 200,
            handler: success_data_handler
        },
        rule! {
            id: "created",
            status: 201,
            handler: success_data_handler
        },
        rule! {
            id: "no_content",
            status: 204,
            handler: success_data_handler
        },
        rule! {
            id: "multi_status",
            status: 207,
            handler: success_data_handler
        },
        // -- Any operation: errors -------------------------------------------
        rule! {
            id: "bad_request",
            status: 400,
            handler: error_handler,
            message: "Bad Request - One or more validation errors occurred."
        },
        rule! {
            id: "unauthorized",
            status: 401,
            handler: error_handler,
            message: "Not Authorized - You are not authorized to access this resource."
        },
        rule! {
            id: "not_found",
            status: 404,
            handler: error_handler,
            message: "Not Found - The requested entity could not be found."
        },
        rule! {
            id: "internal_server_error",
            status: 500,
            handler: error_handler,
            message: "Internal Server Error - An unexpected error occurred on the server. Please check your platform logs for more details."
        },
    ]
}
