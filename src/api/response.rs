use bson::Document;
use serde_json::{Value, json};

use crate::errors::ApiError;
use crate::query::PagedResult;
use crate::utils::json::record_to_json;

/// Status code plus JSON body, ready for a transport layer to write out.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub body: Value,
}

impl Response {
    #[must_use]
    pub const fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

fn records(data: &[Document]) -> Value {
    Value::Array(data.iter().map(record_to_json).collect())
}

/// `{success, count, pagination, data}` where `count` is the filtered total.
#[must_use]
pub fn list_response(result: &PagedResult) -> Response {
    let pagination = serde_json::to_value(result.pagination).unwrap_or(Value::Null);
    Response::new(
        200,
        json!({
            "success": true,
            "count": result.total,
            "pagination": pagination,
            "data": records(&result.data),
        }),
    )
}

/// Unpaginated `{success, count, data}` used for children of one parent.
#[must_use]
pub fn collection_response(data: &[Document]) -> Response {
    Response::new(200, json!({"success": true, "count": data.len(), "data": records(data)}))
}

#[must_use]
pub fn record_response(status: u16, record: &Document) -> Response {
    Response::new(status, json!({"success": true, "data": record_to_json(record)}))
}

#[must_use]
pub fn deleted_response() -> Response {
    Response::new(200, json!({"success": true, "data": {}}))
}

/// Error envelope. Internal failures are not described to the client.
#[must_use]
pub fn error_response(err: &ApiError) -> Response {
    let status = err.status_code();
    let message = match err {
        ApiError::Config(_) | ApiError::Io(_) | ApiError::Json(_) | ApiError::Toml(_) => {
            "Server Error".to_string()
        }
        other => other.to_string(),
    };
    if status >= 500 {
        log::error!("request failed with {status}: {err}");
    } else {
        log::debug!("request rejected with {status}: {err}");
    }
    Response::new(status, json!({"success": false, "error": message}))
}

/// Renders `result` with `ok` on success and the error envelope otherwise.
pub fn respond<T>(result: Result<T, ApiError>, ok: impl FnOnce(T) -> Response) -> Response {
    match result {
        Ok(v) => ok(v),
        Err(e) => error_response(&e),
    }
}
