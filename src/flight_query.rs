use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::flights::FlightRecord;
use crate::flights_repo::FlightStore;
use crate::ingest_pipeline::{CycleOutcome, IngestPipeline};

/// The most recent complete batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatestBatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_ingestion: Option<DateTime<Utc>>,
    pub count: usize,
    pub data: Vec<FlightRecord>,
}

impl LatestBatch {
    pub fn empty() -> Self {
        Self {
            latest_ingestion: None,
            count: 0,
            data: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Inserted(usize),
    NoFlights,
}

/// Read side of the tracker plus the manual refresh hook
///
/// Reads only ever see whole batches: the latest ingestion time is looked up
/// first, then exactly the rows carrying that tag are returned.
#[derive(Clone)]
pub struct FlightQueryService {
    store: Arc<dyn FlightStore>,
    pipeline: Arc<IngestPipeline>,
}

impl FlightQueryService {
    pub fn new(store: Arc<dyn FlightStore>, pipeline: Arc<IngestPipeline>) -> Self {
        Self { store, pipeline }
    }

    pub async fn latest(&self) -> Result<LatestBatch> {
        let Some(latest) = self
            .store
            .latest_ingestion_time()
            .await
            .context("Failed to look up latest ingestion time")?
        else {
            return Ok(LatestBatch::empty());
        };

        let data = self
            .store
            .flights_ingested_at(latest)
            .await
            .with_context(|| format!("Failed to load flights for batch {}", latest))?;

        Ok(LatestBatch {
            latest_ingestion: Some(latest),
            count: data.len(),
            data,
        })
    }

    /// Run one ingestion cycle now, independently of the scheduler
    #[tracing::instrument(skip(self))]
    pub async fn force_refresh(&self) -> Result<RefreshOutcome> {
        info!("Manual refresh requested");
        match self.pipeline.run_cycle().await? {
            CycleOutcome::Written { count, .. } => Ok(RefreshOutcome::Inserted(count)),
            CycleOutcome::NoFlights => Ok(RefreshOutcome::NoFlights),
        }
    }
}
