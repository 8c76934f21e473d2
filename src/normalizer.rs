use tracing::{debug, info};

use crate::flights::NormalizedFlight;
use crate::raw_state::{RawState, StateVector};

impl From<StateVector> for NormalizedFlight {
    fn from(state: StateVector) -> Self {
        Self {
            callsign: state
                .callsign
                .map(|c| c.trim().to_string())
                .unwrap_or_default(),
            origin_country: state.origin_country,
            longitude: state.longitude,
            latitude: state.latitude,
            velocity: state.velocity,
            baro_altitude: state.baro_altitude,
            on_ground: state.on_ground,
        }
    }
}

/// Convert raw upstream rows into the reduced flight column set
///
/// Rows that cannot be parsed into a state vector are dropped. Values absent
/// upstream stay absent; nothing is coerced to zero here.
pub fn normalize(states: &[RawState]) -> Vec<NormalizedFlight> {
    if states.is_empty() {
        return Vec::new();
    }

    let mut flights = Vec::with_capacity(states.len());
    let mut dropped = 0usize;

    for raw in states {
        match StateVector::try_from(raw) {
            Ok(state) => flights.push(NormalizedFlight::from(state)),
            Err(e) => {
                dropped += 1;
                debug!("Dropping unparseable state {}: {}", raw.0, e);
            }
        }
    }

    if dropped > 0 {
        metrics::counter!("normalizer.rows.dropped_total").increment(dropped as u64);
        info!(
            "Normalized {} of {} states ({} dropped)",
            flights.len(),
            states.len(),
            dropped
        );
    }

    flights
}
