use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use tracing::debug;

use crate::batch::Batch;
use crate::database::PgPool;
use crate::flights::FlightRecord;
use crate::schema::flights;

/// Append-only storage for flight batches
///
/// Implementations must make `append_batch` atomic with respect to readers:
/// a reader that sees a batch's `ingestion_time` as the maximum must also see
/// every row of that batch.
#[async_trait]
pub trait FlightStore: Send + Sync {
    /// Insert all records of a batch as one unit, returning the number of rows written
    async fn append_batch(&self, batch: &Batch) -> Result<usize>;

    /// Latest ingestion time across all stored records, if any
    async fn latest_ingestion_time(&self) -> Result<Option<DateTime<Utc>>>;

    /// All records whose ingestion time equals `ingestion_time` exactly, in insertion order
    async fn flights_ingested_at(&self, ingestion_time: DateTime<Utc>)
    -> Result<Vec<FlightRecord>>;
}

/// Diesel model for the flights table
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = flights)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct FlightModel {
    pub id: i64,
    pub callsign: String,
    pub origin_country: String,
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
    pub velocity: Option<f64>,
    pub baro_altitude: Option<f64>,
    pub on_ground: bool,
    pub ingestion_time: DateTime<Utc>,
}

/// Insert model for new flight rows
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = flights)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewFlightModel {
    pub callsign: String,
    pub origin_country: String,
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
    pub velocity: Option<f64>,
    pub baro_altitude: Option<f64>,
    pub on_ground: bool,
    pub ingestion_time: DateTime<Utc>,
}

impl From<&FlightRecord> for NewFlightModel {
    fn from(record: &FlightRecord) -> Self {
        Self {
            callsign: record.callsign.clone(),
            origin_country: record.origin_country.clone(),
            longitude: record.longitude,
            latitude: record.latitude,
            velocity: record.velocity,
            baro_altitude: record.baro_altitude,
            on_ground: record.on_ground,
            ingestion_time: record.ingestion_time,
        }
    }
}

impl From<FlightModel> for FlightRecord {
    fn from(model: FlightModel) -> Self {
        Self {
            callsign: model.callsign,
            origin_country: model.origin_country,
            longitude: model.longitude,
            latitude: model.latitude,
            velocity: model.velocity,
            baro_altitude: model.baro_altitude,
            on_ground: model.on_ground,
            ingestion_time: model.ingestion_time,
        }
    }
}

/// PostgreSQL-backed flight store
#[derive(Clone)]
pub struct FlightsRepository {
    pool: PgPool,
}

impl FlightsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FlightStore for FlightsRepository {
    async fn append_batch(&self, batch: &Batch) -> Result<usize> {
        if batch.is_empty() {
            return Ok(0);
        }

        let pool = self.pool.clone();
        let rows: Vec<NewFlightModel> = batch.records.iter().map(NewFlightModel::from).collect();

        // 8 bind parameters per row keeps each statement well below the 65535 limit
        const CHUNK_SIZE: usize = 1000;

        let inserted = tokio::task::spawn_blocking(move || {
            let mut conn = pool
                .get()
                .context("Failed to get database connection")?;

            conn.transaction::<usize, anyhow::Error, _>(|conn| {
                let mut inserted = 0;
                for chunk in rows.chunks(CHUNK_SIZE) {
                    inserted += diesel::insert_into(flights::table)
                        .values(chunk)
                        .execute(conn)?;
                }
                Ok(inserted)
            })
        })
        .await
        .context("Flight insert task panicked")??;

        debug!(
            "Inserted {} flights for batch {}",
            inserted, batch.ingestion_time
        );

        Ok(inserted)
    }

    async fn latest_ingestion_time(&self) -> Result<Option<DateTime<Utc>>> {
        let pool = self.pool.clone();

        let latest = tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            let latest: Option<DateTime<Utc>> = flights::table
                .select(diesel::dsl::max(flights::ingestion_time))
                .get_result(&mut conn)?;
            Ok::<Option<DateTime<Utc>>, anyhow::Error>(latest)
        })
        .await??;

        Ok(latest)
    }

    async fn flights_ingested_at(
        &self,
        ingestion_time: DateTime<Utc>,
    ) -> Result<Vec<FlightRecord>> {
        let pool = self.pool.clone();

        let models = tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            let models: Vec<FlightModel> = flights::table
                .filter(flights::ingestion_time.eq(ingestion_time))
                .order(flights::id.asc())
                .select(FlightModel::as_select())
                .load(&mut conn)?;
            Ok::<Vec<FlightModel>, anyhow::Error>(models)
        })
        .await??;

        Ok(models.into_iter().map(FlightRecord::from).collect())
    }
}
