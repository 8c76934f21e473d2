//! In-process flight store.
//!
//! Backs the pipeline, query and HTTP tests without PostgreSQL. The single
//! `RwLock` plays the role of the database's transaction isolation: a batch
//! is appended under one write guard, so readers see all of it or none of it.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::batch::Batch;
use crate::flights::FlightRecord;
use crate::flights_repo::FlightStore;

#[derive(Debug, Default)]
pub struct MemoryFlightStore {
    rows: RwLock<Vec<FlightRecord>>,
    unavailable: AtomicBool,
}

impl MemoryFlightStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent operation fail as if the database were unreachable
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.read_rows().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn ensure_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            anyhow::bail!("connection refused: flight store is unavailable");
        }
        Ok(())
    }

    fn read_rows(&self) -> std::sync::RwLockReadGuard<'_, Vec<FlightRecord>> {
        self.rows
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl FlightStore for MemoryFlightStore {
    async fn append_batch(&self, batch: &Batch) -> Result<usize> {
        self.ensure_available()?;

        let mut rows = self
            .rows
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        rows.extend(batch.records.iter().cloned());
        Ok(batch.len())
    }

    async fn latest_ingestion_time(&self) -> Result<Option<DateTime<Utc>>> {
        self.ensure_available()?;
        Ok(self.read_rows().iter().map(|r| r.ingestion_time).max())
    }

    async fn flights_ingested_at(
        &self,
        ingestion_time: DateTime<Utc>,
    ) -> Result<Vec<FlightRecord>> {
        self.ensure_available()?;
        Ok(self
            .read_rows()
            .iter()
            .filter(|r| r.ingestion_time == ingestion_time)
            .cloned()
            .collect())
    }
}
