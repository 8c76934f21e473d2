//! Root health/status endpoint
//!
//! Reports that the API is online together with the build version and how
//! long the server has been running.

use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use std::time::Instant;

/// Server start time - initialized when the server starts
static SERVER_START_TIME: OnceLock<Instant> = OnceLock::new();

pub fn init_server_start_time() {
    SERVER_START_TIME.get_or_init(Instant::now);
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusInfo {
    pub status: String,
    pub message: String,
    /// Git version from `git describe`, or the crate version outside a checkout
    pub version: String,
    pub git_commit: Option<String>,
    pub uptime_seconds: u64,
    pub uptime_human: String,
}

// vergen emits placeholder values when git metadata is unavailable
fn build_value(value: Option<&'static str>) -> Option<&'static str> {
    value.filter(|v| !v.is_empty() && !v.starts_with("VERGEN_"))
}

pub fn version() -> &'static str {
    build_value(option_env!("VERGEN_GIT_DESCRIBE")).unwrap_or(env!("CARGO_PKG_VERSION"))
}

/// Format seconds into a human-readable duration string
fn format_duration(seconds: u64) -> String {
    let days = seconds / 86400;
    let hours = (seconds % 86400) / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if days > 0 {
        format!("{}d {}h {}m {}s", days, hours, minutes, secs)
    } else if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}

/// GET /
#[tracing::instrument]
pub async fn get_status() -> impl IntoResponse {
    let start_time = SERVER_START_TIME.get_or_init(Instant::now);
    let uptime_seconds = start_time.elapsed().as_secs();

    let status = StatusInfo {
        status: "online".to_string(),
        message: "Swiss Flight Tracker API is running".to_string(),
        version: version().to_string(),
        git_commit: build_value(option_env!("VERGEN_GIT_SHA")).map(str::to_string),
        uptime_seconds,
        uptime_human: format_duration(uptime_seconds),
    };

    (StatusCode::OK, Json(status))
}
