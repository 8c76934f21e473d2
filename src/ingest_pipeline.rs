use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use crate::batch::BatchTagger;
use crate::batch_writer::{BatchWriter, WriteOutcome};
use crate::bounding_box::BoundingBox;
use crate::flights_repo::FlightStore;
use crate::normalizer::normalize;
use crate::opensky_client::StateSource;

/// Phase of the ingestion cycle currently executing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    Idle,
    Fetching,
    Normalizing,
    Tagging,
    Writing,
}

impl std::fmt::Display for CyclePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CyclePhase::Idle => "idle",
            CyclePhase::Fetching => "fetching",
            CyclePhase::Normalizing => "normalizing",
            CyclePhase::Tagging => "tagging",
            CyclePhase::Writing => "writing",
        };
        f.write_str(name)
    }
}

/// What a completed cycle produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// A batch was committed under `ingestion_time`
    Written {
        ingestion_time: DateTime<Utc>,
        count: usize,
    },
    /// The fetch yielded nothing usable; nothing was written
    NoFlights,
}

/// One fetch → normalize → tag → write pass over a bounding box
///
/// Shared by the scheduler and the manual refresh path. Each call to
/// [`IngestPipeline::run_cycle`] produces at most one batch.
pub struct IngestPipeline {
    source: Arc<dyn StateSource>,
    writer: BatchWriter,
    tagger: BatchTagger,
    bbox: BoundingBox,
}

impl IngestPipeline {
    pub fn new(
        source: Arc<dyn StateSource>,
        store: Arc<dyn FlightStore>,
        bbox: BoundingBox,
    ) -> Self {
        Self {
            source,
            writer: BatchWriter::new(store),
            tagger: BatchTagger::new(),
            bbox,
        }
    }

    pub fn bounding_box(&self) -> &BoundingBox {
        &self.bbox
    }

    fn enter(&self, phase: CyclePhase) {
        debug!("Ingestion cycle entering {}", phase);
    }

    #[tracing::instrument(skip(self), fields(bbox = %self.bbox))]
    pub async fn run_cycle(&self) -> Result<CycleOutcome> {
        let start = Instant::now();
        let result = self.run_phases().await;
        self.enter(CyclePhase::Idle);

        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        metrics::histogram!("ingest.cycle.duration_ms").record(elapsed_ms);
        result
    }

    async fn run_phases(&self) -> Result<CycleOutcome> {
        self.enter(CyclePhase::Fetching);
        let outcome = self.source.fetch(&self.bbox).await;
        if outcome.is_empty() {
            info!("No flights retrieved.");
            return Ok(CycleOutcome::NoFlights);
        }

        self.enter(CyclePhase::Normalizing);
        let states = outcome.into_states();
        let flights = normalize(&states);
        drop(states);
        if flights.is_empty() {
            info!("No parseable flights in snapshot");
            return Ok(CycleOutcome::NoFlights);
        }

        self.enter(CyclePhase::Tagging);
        let batch = self.tagger.tag(flights);

        self.enter(CyclePhase::Writing);
        let ingestion_time = batch.ingestion_time;
        let written = self
            .writer
            .write(&batch)
            .await
            .with_context(|| format!("Ingestion cycle failed while {}", CyclePhase::Writing))?;

        Ok(match written {
            WriteOutcome::Written(count) => CycleOutcome::Written {
                ingestion_time,
                count,
            },
            WriteOutcome::NothingToWrite => CycleOutcome::NoFlights,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_store::MemoryFlightStore;
    use crate::opensky_client::FetchOutcome;
    use crate::raw_state::RawState;
    use async_trait::async_trait;
    use serde_json::json;

    struct FixedSource(FetchOutcome);

    #[async_trait]
    impl StateSource for FixedSource {
        async fn fetch(&self, _bbox: &BoundingBox) -> FetchOutcome {
            self.0.clone()
        }
    }

    fn state(callsign: &str) -> RawState {
        RawState(json!([
            "4b1805", callsign, "Switzerland", 1700000000, 1700000001, 8.55, 47.45,
            3000.0, false, 150.0, 90.0, 0.0, null, 3100.0, "7000", false, 0
        ]))
    }

    fn pipeline(outcome: FetchOutcome, store: Arc<MemoryFlightStore>) -> IngestPipeline {
        IngestPipeline::new(
            Arc::new(FixedSource(outcome)),
            store,
            BoundingBox::default(),
        )
    }

    #[tokio::test]
    async fn test_empty_fetch_writes_nothing() {
        let store = Arc::new(MemoryFlightStore::new());
        let pipeline = pipeline(FetchOutcome::Empty, store.clone());

        let outcome = pipeline.run_cycle().await.unwrap();

        assert_eq!(outcome, CycleOutcome::NoFlights);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_only_unparseable_rows_writes_nothing() {
        let store = Arc::new(MemoryFlightStore::new());
        let pipeline = pipeline(
            FetchOutcome::States(vec![RawState(json!("junk"))]),
            store.clone(),
        );

        assert_eq!(pipeline.run_cycle().await.unwrap(), CycleOutcome::NoFlights);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_cycle_writes_batch() {
        let store = Arc::new(MemoryFlightStore::new());
        let pipeline = pipeline(
            FetchOutcome::States(vec![state("SWR1"), state("SWR2")]),
            store.clone(),
        );
        let outcome = pipeline.run_cycle().await.unwrap();

        match outcome {
            CycleOutcome::Written { count, .. } => assert_eq!(count, 2),
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_write_failure_is_reported_with_phase() {
        let store = Arc::new(MemoryFlightStore::new());
        store.set_unavailable(true);
        let pipeline = pipeline(FetchOutcome::States(vec![state("SWR1")]), store.clone());

        let err = pipeline.run_cycle().await.unwrap_err();

        assert!(format!("{:#}", err).contains("while writing"));
    }
}
