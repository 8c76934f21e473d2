pub mod flights;
pub mod status;

pub use flights::*;
pub use status::*;

use axum::{Json, http::StatusCode};
use serde_json::{Value, json};

/// Error body shared by all handlers: `{"detail": "..."}`
pub fn json_error(status: StatusCode, detail: impl Into<String>) -> (StatusCode, Json<Value>) {
    (status, Json(json!({ "detail": detail.into() })))
}
