//! Swiss flight tracker
//!
//! Polls the OpenSky Network for aircraft state vectors inside a bounding
//! box, normalizes them into flight records, stores each snapshot as an
//! atomically written batch and serves the most recent batch over HTTP.

pub mod actions;
pub mod batch;
pub mod batch_writer;
pub mod bounding_box;
pub mod dashboard;
pub mod database;
pub mod flight_query;
pub mod flights;
pub mod flights_repo;
pub mod ingest_lock;
pub mod ingest_pipeline;
pub mod memory_store;
pub mod metrics;
pub mod normalizer;
pub mod opensky_auth;
pub mod opensky_client;
pub mod raw_state;
pub mod scheduler;
pub mod schema;
pub mod tracker_config;
pub mod web;

pub use bounding_box::BoundingBox;
pub use flight_query::{FlightQueryService, LatestBatch, RefreshOutcome};
pub use flights::{FlightRecord, NormalizedFlight};
pub use flights_repo::FlightStore;
pub use ingest_pipeline::{CycleOutcome, IngestPipeline};
pub use opensky_client::{FetchOutcome, OpenSkyClient, StateSource};
