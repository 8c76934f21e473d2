pub mod dashboard;
pub mod ingest;
pub mod refresh;
pub mod serve;

pub use dashboard::handle_dashboard;
pub use ingest::handle_ingest;
pub use refresh::handle_refresh;
pub use serve::handle_serve;

use anyhow::Result;
use std::sync::Arc;
use swiss_tracker::database::{create_pool, run_migrations};
use swiss_tracker::flights_repo::{FlightStore, FlightsRepository};
use swiss_tracker::ingest_pipeline::IngestPipeline;
use swiss_tracker::opensky_client::OpenSkyClient;
use swiss_tracker::tracker_config::TrackerConfig;
use tracing::info;

/// Store and pipeline shared by every command that touches the database
pub struct Runtime {
    pub store: Arc<dyn FlightStore>,
    pub pipeline: Arc<IngestPipeline>,
}

/// Connect to PostgreSQL, apply migrations and wire the ingestion pipeline
pub async fn build_runtime(config: &TrackerConfig) -> Result<Runtime> {
    let pool = create_pool(&config.database_url)?;
    run_migrations(&pool).await?;

    let store: Arc<dyn FlightStore> = Arc::new(FlightsRepository::new(pool));
    let source = Arc::new(OpenSkyClient::new(config.opensky.clone())?);

    info!(
        "Tracking bounding box {} with {} credentials",
        config.bounding_box,
        config.opensky.credentials.kind()
    );

    let pipeline = Arc::new(IngestPipeline::new(
        source,
        store.clone(),
        config.bounding_box,
    ));

    Ok(Runtime { store, pipeline })
}
