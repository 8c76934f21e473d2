use anyhow::Result;
use swiss_tracker::flight_query::{FlightQueryService, RefreshOutcome};
use swiss_tracker::tracker_config::TrackerConfig;

use super::build_runtime;

/// Run one ingestion cycle against the database and report what it stored
#[tracing::instrument(skip_all)]
pub async fn handle_refresh(config: TrackerConfig) -> Result<()> {
    sentry::configure_scope(|scope| {
        scope.set_tag("operation", "refresh");
    });

    let runtime = build_runtime(&config).await?;
    let query = FlightQueryService::new(runtime.store, runtime.pipeline);

    match query.force_refresh().await? {
        RefreshOutcome::Inserted(count) => println!("{} new flights inserted.", count),
        RefreshOutcome::NoFlights => println!("No flights retrieved."),
    }

    Ok(())
}
