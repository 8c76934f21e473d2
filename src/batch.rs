use chrono::{DateTime, SubsecRound, TimeDelta, Utc};
use std::sync::Mutex;

use crate::flights::{FlightRecord, NormalizedFlight};

/// All records produced by one fetch cycle, keyed by their shared ingestion time
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub ingestion_time: DateTime<Utc>,
    pub records: Vec<FlightRecord>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Capture time truncated to the precision of a Postgres `timestamptz`
pub fn capture_time() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Stamps every record of a cycle with one shared ingestion time
///
/// Tags handed out by one tagger are strictly increasing, so two cycles never
/// share a batch key even if the clock has not advanced between them.
#[derive(Debug, Default)]
pub struct BatchTagger {
    last_tag: Mutex<Option<DateTime<Utc>>>,
}

impl BatchTagger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tag(&self, flights: Vec<NormalizedFlight>) -> Batch {
        self.tag_at(flights, capture_time())
    }

    pub fn tag_at(&self, flights: Vec<NormalizedFlight>, captured_at: DateTime<Utc>) -> Batch {
        let ingestion_time = self.next_tag(captured_at.trunc_subsecs(6));
        let records = flights
            .into_iter()
            .map(|flight| FlightRecord::from_normalized(flight, ingestion_time))
            .collect();

        Batch {
            ingestion_time,
            records,
        }
    }

    fn next_tag(&self, captured_at: DateTime<Utc>) -> DateTime<Utc> {
        let mut last_tag = self
            .last_tag
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let tag = match *last_tag {
            Some(previous) if captured_at <= previous => previous + TimeDelta::microseconds(1),
            _ => captured_at,
        };
        *last_tag = Some(tag);
        tag
    }
}
