use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::actions::json_error;
use crate::flight_query::RefreshOutcome;
use crate::web::AppState;

/// Body of a refresh response
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RefreshResponse {
    pub status: String,
    pub message: String,
}

impl From<RefreshOutcome> for RefreshResponse {
    fn from(outcome: RefreshOutcome) -> Self {
        match outcome {
            RefreshOutcome::Inserted(count) => Self {
                status: "success".to_string(),
                message: format!("{} new flights inserted.", count),
            },
            RefreshOutcome::NoFlights => Self {
                status: "warning".to_string(),
                message: "No flights retrieved.".to_string(),
            },
        }
    }
}

/// GET /flights/latest
/// Every flight from the most recent batch
pub async fn get_latest_flights(State(state): State<AppState>) -> impl IntoResponse {
    match state.query.latest().await {
        Ok(latest) => Json(latest).into_response(),
        Err(e) => {
            error!("Failed to load latest flights: {:#}", e);
            json_error(StatusCode::INTERNAL_SERVER_ERROR, format!("{:#}", e)).into_response()
        }
    }
}

/// POST /flights/refresh
/// Run one ingestion cycle immediately
pub async fn refresh_flights(State(state): State<AppState>) -> impl IntoResponse {
    match state.query.force_refresh().await {
        Ok(outcome) => Json(RefreshResponse::from(outcome)).into_response(),
        Err(e) => {
            error!("Manual refresh failed: {:#}", e);
            json_error(StatusCode::INTERNAL_SERVER_ERROR, format!("{:#}", e)).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_messages() {
        assert_eq!(
            RefreshResponse::from(RefreshOutcome::Inserted(3)).message,
            "3 new flights inserted."
        );
        let warning = RefreshResponse::from(RefreshOutcome::NoFlights);
        assert_eq!(warning.status, "warning");
        assert_eq!(warning.message, "No flights retrieved.");
    }
}
