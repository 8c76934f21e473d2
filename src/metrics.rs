use anyhow::{Context, Result};
use axum::{Router, routing::get};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::sync::OnceLock;
use std::time::{Duration, Instant};
use tracing::info;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder
/// Returns a handle that can be used to render metrics for scraping
pub fn init_metrics() -> Result<PrometheusHandle> {
    PrometheusBuilder::new()
        // Buckets: 1ms .. 30s, covering both single inserts and slow upstream fetches
        .set_buckets_for_metric(
            Matcher::Suffix("duration_ms".to_string()),
            &[
                1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0,
                10000.0, 30000.0,
            ],
        )
        .context("Failed to set histogram buckets")?
        .install_recorder()
        .context("Failed to install Prometheus recorder")
}

/// Background task to update process metrics
/// Updates uptime and memory usage metrics every 5 seconds
pub async fn process_metrics_task() {
    let start_time = Instant::now();

    loop {
        metrics::gauge!("process.uptime.seconds").set(start_time.elapsed().as_secs() as f64);
        metrics::gauge!("process.is_up").set(1.0);

        #[cfg(target_os = "linux")]
        {
            if let Ok(status) = std::fs::read_to_string("/proc/self/status") {
                for line in status.lines() {
                    if line.starts_with("VmRSS:") {
                        // RSS is reported in kB
                        if let Some(kb_str) = line.split_whitespace().nth(1)
                            && let Ok(kb) = kb_str.parse::<f64>()
                        {
                            metrics::gauge!("process.memory.bytes").set(kb * 1024.0);
                        }
                        break;
                    }
                }
            }
        }

        tokio::time::sleep(Duration::from_secs(5)).await;
    }
}

/// Initialize ingestion metrics to zero
/// This ensures metrics always appear in Prometheus queries even if no events have occurred
pub fn initialize_ingest_metrics() {
    metrics::counter!("ingest.cycle.completed_total").absolute(0);
    metrics::counter!("ingest.cycle.empty_total").absolute(0);
    metrics::counter!("ingest.cycle.failed_total").absolute(0);
    metrics::counter!("ingest.loop.fault_total").absolute(0);

    metrics::counter!("opensky.fetch.success_total").absolute(0);
    metrics::counter!("opensky.fetch.empty_total").absolute(0);
    metrics::counter!("opensky.fetch.failed_total").absolute(0);
    metrics::counter!("opensky.token.refreshed_total").absolute(0);
    metrics::counter!("opensky.token.cache_hit_total").absolute(0);
    metrics::counter!("opensky.token.failed_total").absolute(0);

    metrics::counter!("normalizer.rows.dropped_total").absolute(0);
    metrics::counter!("store.rows.written_total").absolute(0);
    metrics::counter!("store.write.failed_total").absolute(0);
}

/// Install the recorder once for the whole process
pub fn install_recorder() -> Result<()> {
    if METRICS_HANDLE.get().is_some() {
        return Ok(());
    }
    let handle = init_metrics()?;
    if METRICS_HANDLE.set(handle).is_err() {
        anyhow::bail!("Metrics handle already initialized");
    }
    Ok(())
}

/// Start a standalone metrics server on the specified port
pub async fn start_metrics_server(port: u16) -> Result<()> {
    install_recorder()?;

    tokio::spawn(process_metrics_task());

    let app = Router::new().route(
        "/metrics",
        get(|| async {
            METRICS_HANDLE
                .get()
                .map(PrometheusHandle::render)
                .unwrap_or_default()
        }),
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting metrics server on http://{}/metrics", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind metrics server on {}", addr))?;

    axum::serve(listener, app)
        .await
        .context("Metrics server failed")
}
