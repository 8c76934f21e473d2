use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A flight observation after normalization, before it is assigned to a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedFlight {
    /// Trimmed callsign (empty when the transponder sent none)
    pub callsign: String,
    pub origin_country: String,
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
    /// Ground speed in m/s
    pub velocity: Option<f64>,
    /// Barometric altitude in meters
    pub baro_altitude: Option<f64>,
    pub on_ground: bool,
}

/// A persisted flight observation
///
/// Every record written by one fetch cycle shares the same `ingestion_time`,
/// which is the key of its batch. Absent numeric values stay `None` all the
/// way to storage and serialize as JSON `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightRecord {
    pub callsign: String,
    pub origin_country: String,
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
    pub velocity: Option<f64>,
    pub baro_altitude: Option<f64>,
    pub on_ground: bool,
    pub ingestion_time: DateTime<Utc>,
}

impl FlightRecord {
    pub fn from_normalized(flight: NormalizedFlight, ingestion_time: DateTime<Utc>) -> Self {
        Self {
            callsign: flight.callsign,
            origin_country: flight.origin_country,
            longitude: flight.longitude,
            latitude: flight.latitude,
            velocity: flight.velocity,
            baro_altitude: flight.baro_altitude,
            on_ground: flight.on_ground,
            ingestion_time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_absent_values_serialize_as_null() {
        let record = FlightRecord {
            callsign: "SWR123".to_string(),
            origin_country: "Switzerland".to_string(),
            longitude: Some(8.55),
            latitude: Some(47.45),
            velocity: None,
            baro_altitude: None,
            on_ground: false,
            ingestion_time: Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap(),
        };

        let json = serde_json::to_value(&record).unwrap();
        assert!(json["velocity"].is_null());
        assert!(json["baro_altitude"].is_null());
        assert_eq!(json["longitude"], 8.55);
        assert_eq!(json["ingestion_time"], "2025-03-01T12:00:00Z");
    }
}
