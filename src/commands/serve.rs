use anyhow::Result;
use swiss_tracker::flight_query::FlightQueryService;
use swiss_tracker::ingest_lock::IngestLock;
use swiss_tracker::scheduler::Scheduler;
use swiss_tracker::tracker_config::TrackerConfig;
use swiss_tracker::web::{AppState, start_web_server};
use tracing::{Instrument, info};

use super::build_runtime;

#[tracing::instrument(skip_all)]
pub async fn handle_serve(
    config: TrackerConfig,
    interface: String,
    port: u16,
    with_ingest: bool,
) -> Result<()> {
    sentry::configure_scope(|scope| {
        scope.set_tag("operation", "serve");
    });

    let runtime = build_runtime(&config).await?;

    // Held for the lifetime of the server when ingesting in-process
    let _ingest_lock = if with_ingest {
        let lock = IngestLock::acquire(&config.bounding_box)?;
        let scheduler = Scheduler::new(runtime.pipeline.clone(), config.schedule);
        info!("Starting in-process ingestion alongside the API");
        tokio::spawn(
            scheduler
                .run()
                .instrument(tracing::info_span!("ingest_scheduler")),
        );
        Some(lock)
    } else {
        None
    };

    let state = AppState {
        query: FlightQueryService::new(runtime.store, runtime.pipeline),
    };

    start_web_server(interface, port, state).await
}
