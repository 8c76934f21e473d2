use anyhow::Result;
use swiss_tracker::ingest_lock::IngestLock;
use swiss_tracker::scheduler::Scheduler;
use swiss_tracker::tracker_config::TrackerConfig;
use tracing::{Instrument, error, info};

use super::build_runtime;

#[tracing::instrument(skip_all)]
pub async fn handle_ingest(
    config: TrackerConfig,
    cycles: Option<u64>,
    metrics_port: Option<u16>,
) -> Result<()> {
    sentry::configure_scope(|scope| {
        scope.set_tag("operation", "ingest");
    });

    if let Some(port) = metrics_port {
        // Counters are zeroed only after the recorder exists, so the first
        // scrape already sees every series
        swiss_tracker::metrics::install_recorder()?;
        swiss_tracker::metrics::initialize_ingest_metrics();
        tokio::spawn(
            async move {
                if let Err(e) = swiss_tracker::metrics::start_metrics_server(port).await {
                    error!("Metrics server stopped: {:#}", e);
                }
            }
            .instrument(tracing::info_span!("metrics_server")),
        );
    }

    let _ingest_lock = IngestLock::acquire(&config.bounding_box)?;
    let runtime = build_runtime(&config).await?;
    let mut scheduler = Scheduler::new(runtime.pipeline, config.schedule);

    match cycles {
        Some(cycles) => {
            info!("Running {} ingestion cycle(s)", cycles);
            let events = scheduler.run_cycles(cycles).await;
            info!("Finished {} ingestion cycle(s)", events.len());
        }
        None => {
            info!("Starting continuous ingestion");
            scheduler.run().await;
        }
    }

    Ok(())
}
