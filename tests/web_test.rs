//! HTTP handler tests driven through the router with `oneshot`

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::sync::Arc;
use swiss_tracker::flight_query::FlightQueryService;
use swiss_tracker::memory_store::MemoryFlightStore;
use swiss_tracker::raw_state::RawState;
use swiss_tracker::web::{AppState, router};
use swiss_tracker::{BoundingBox, FetchOutcome, IngestPipeline, StateSource};
use tower::ServiceExt;

struct StaticSource(FetchOutcome);

#[async_trait]
impl StateSource for StaticSource {
    async fn fetch(&self, _bbox: &BoundingBox) -> FetchOutcome {
        self.0.clone()
    }
}

fn swiss_state(callsign: &str) -> RawState {
    RawState(json!([
        "4b1805", callsign, "Switzerland", 1740830400, 1740830401, 7.45, 46.95, 1800.0,
        false, null, 90.0, 0.0, null, 1900.0, null, false, 0
    ]))
}

fn app(outcome: FetchOutcome, store: Arc<MemoryFlightStore>) -> axum::Router {
    let pipeline = Arc::new(IngestPipeline::new(
        Arc::new(StaticSource(outcome)),
        store.clone(),
        BoundingBox::SWITZERLAND,
    ));
    router(AppState {
        query: FlightQueryService::new(store, pipeline),
    })
}

async fn send(app: axum::Router, method: &str, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_root_reports_online() {
    let store = Arc::new(MemoryFlightStore::new());
    let (status, body) = send(app(FetchOutcome::Empty, store), "GET", "/").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "online");
    assert!(body["version"].as_str().is_some_and(|v| !v.is_empty()));
    assert!(body["uptime_seconds"].is_u64());
}

#[tokio::test]
async fn test_latest_on_empty_store() {
    let store = Arc::new(MemoryFlightStore::new());
    let (status, body) = send(app(FetchOutcome::Empty, store), "GET", "/flights/latest").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"count": 0, "data": []}));
}

#[tokio::test]
async fn test_refresh_then_latest() {
    let store = Arc::new(MemoryFlightStore::new());
    let outcome = FetchOutcome::States(vec![swiss_state("SWR10 "), swiss_state("EZS22")]);

    let (status, body) = send(
        app(outcome.clone(), store.clone()),
        "POST",
        "/flights/refresh",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"status": "success", "message": "2 new flights inserted."})
    );

    let (status, body) = send(app(outcome, store), "GET", "/flights/latest").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
    assert!(body["latest_ingestion"].is_string());
    assert_eq!(body["data"][0]["callsign"], "SWR10");
    assert_eq!(body["data"][0]["velocity"], Value::Null);
    assert_eq!(body["data"][0]["ingestion_time"], body["latest_ingestion"]);
}

#[tokio::test]
async fn test_refresh_with_nothing_upstream_warns() {
    let store = Arc::new(MemoryFlightStore::new());
    let (status, body) = send(app(FetchOutcome::Empty, store), "POST", "/flights/refresh").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"status": "warning", "message": "No flights retrieved."})
    );
}

#[tokio::test]
async fn test_refresh_write_failure_returns_500() {
    let store = Arc::new(MemoryFlightStore::new());
    store.set_unavailable(true);
    let outcome = FetchOutcome::States(vec![swiss_state("SWR10")]);

    let (status, body) = send(app(outcome, store), "POST", "/flights/refresh").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(
        body["detail"]
            .as_str()
            .is_some_and(|d| d.contains("unavailable"))
    );
}

#[tokio::test]
async fn test_latest_store_failure_returns_500() {
    let store = Arc::new(MemoryFlightStore::new());
    store.set_unavailable(true);

    let (status, body) = send(app(FetchOutcome::Empty, store), "GET", "/flights/latest").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["detail"].is_string());
}
