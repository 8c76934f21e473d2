use anyhow::Result;
use metrics::{counter, histogram};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

use crate::batch::Batch;
use crate::flights_repo::FlightStore;

/// Result of a successful write call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// All rows of the batch were committed
    Written(usize),
    /// The batch was empty; nothing was sent to the store
    NothingToWrite,
}

/// Appends batches to the flight store
///
/// Write failures are logged and returned to the caller; they never abort the
/// process.
#[derive(Clone)]
pub struct BatchWriter {
    store: Arc<dyn FlightStore>,
}

impl BatchWriter {
    pub fn new(store: Arc<dyn FlightStore>) -> Self {
        Self { store }
    }

    pub async fn write(&self, batch: &Batch) -> Result<WriteOutcome> {
        if batch.is_empty() {
            info!("No data to load.");
            return Ok(WriteOutcome::NothingToWrite);
        }

        let batch_size = batch.len();
        let start = Instant::now();

        match self.store.append_batch(batch).await {
            Ok(written) => {
                let duration = start.elapsed();
                counter!("store.rows.written_total").increment(written as u64);
                histogram!("store.batch.size").record(batch_size as f64);
                histogram!("store.batch.duration_ms").record(duration.as_millis() as f64);

                info!(
                    "Inserted {} rows for batch {} in {:.1}ms",
                    written,
                    batch.ingestion_time,
                    duration.as_secs_f64() * 1000.0
                );
                Ok(WriteOutcome::Written(written))
            }
            Err(e) => {
                error!(
                    "Failed to write batch {} ({} rows): {:#}",
                    batch.ingestion_time, batch_size, e
                );
                counter!("store.write.failed_total").increment(1);
                Err(e.context(format!(
                    "Failed to write batch {} ({} rows)",
                    batch.ingestion_time, batch_size
                )))
            }
        }
    }
}
