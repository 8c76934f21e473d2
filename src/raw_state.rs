//! Positional state vectors as delivered by the OpenSky `/states/all` endpoint.
//!
//! Each state is a heterogeneous JSON array:
//!
//! | idx | field           | type            |
//! |-----|-----------------|-----------------|
//! | 0   | icao24          | string          |
//! | 1   | callsign        | string \| null  |
//! | 2   | origin_country  | string          |
//! | 3   | time_position   | int \| null     |
//! | 4   | last_contact    | int             |
//! | 5   | longitude       | float \| null   |
//! | 6   | latitude        | float \| null   |
//! | 7   | baro_altitude   | float \| null   |
//! | 8   | on_ground       | bool            |
//! | 9   | velocity        | float \| null   |
//! | 10  | true_track      | float \| null   |
//! | 11  | vertical_rate   | float \| null   |
//! | 12  | sensors         | int[] \| null   |
//! | 13  | geo_altitude    | float \| null   |
//! | 14  | squawk          | string \| null  |
//! | 15  | spi             | bool            |
//! | 16  | position_source | int             |
//!
//! An 18th `category` column is appended when extended data is requested; it is ignored.
//!
//! Only the stored columns (callsign, origin_country, longitude, latitude,
//! baro_altitude, on_ground, velocity) are checked strictly. The remaining
//! columns are read leniently: a null or mistyped value there becomes `None`
//! and never rejects the row.

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Number of positional fields in a state vector
pub const STATE_FIELD_COUNT: usize = 17;

/// One raw upstream row, kept untyped until normalization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawState(pub Value);

impl RawState {
    pub fn new(value: Value) -> Self {
        Self(value)
    }
}

impl From<Value> for RawState {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// Typed state vector
#[derive(Debug, Clone, PartialEq)]
pub struct StateVector {
    pub icao24: Option<String>,
    pub callsign: Option<String>,
    pub origin_country: String,
    pub time_position: Option<i64>,
    pub last_contact: Option<i64>,
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
    pub baro_altitude: Option<f64>,
    pub on_ground: bool,
    pub velocity: Option<f64>,
    pub true_track: Option<f64>,
    pub vertical_rate: Option<f64>,
    pub sensors: Option<Vec<i64>>,
    pub geo_altitude: Option<f64>,
    pub squawk: Option<String>,
    pub spi: Option<bool>,
    pub position_source: Option<i64>,
}

impl TryFrom<&RawState> for StateVector {
    type Error = anyhow::Error;

    fn try_from(raw: &RawState) -> Result<Self> {
        let fields = raw
            .0
            .as_array()
            .ok_or_else(|| anyhow!("state is not an array"))?;

        if fields.len() < STATE_FIELD_COUNT {
            anyhow::bail!(
                "state has {} fields, expected at least {}",
                fields.len(),
                STATE_FIELD_COUNT
            );
        }

        Ok(Self {
            icao24: fields[0].as_str().map(str::to_string),
            callsign: optional_string(fields, 1, "callsign")?,
            origin_country: required_string(fields, 2, "origin_country")?,
            time_position: fields[3].as_i64(),
            last_contact: fields[4].as_i64(),
            longitude: optional_f64(fields, 5, "longitude")?,
            latitude: optional_f64(fields, 6, "latitude")?,
            baro_altitude: optional_f64(fields, 7, "baro_altitude")?,
            on_ground: required_bool(fields, 8, "on_ground")?,
            velocity: optional_f64(fields, 9, "velocity")?,
            true_track: fields[10].as_f64(),
            vertical_rate: fields[11].as_f64(),
            sensors: fields[12]
                .as_array()
                .map(|ids| ids.iter().filter_map(Value::as_i64).collect()),
            geo_altitude: fields[13].as_f64(),
            squawk: fields[14].as_str().map(str::to_string),
            spi: fields[15].as_bool(),
            position_source: fields[16].as_i64(),
        })
    }
}

fn required_string(fields: &[Value], idx: usize, name: &str) -> Result<String> {
    optional_string(fields, idx, name)?.ok_or_else(|| anyhow!("{} is null", name))
}

fn optional_string(fields: &[Value], idx: usize, name: &str) -> Result<Option<String>> {
    match &fields[idx] {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        other => Err(anyhow!("{} is not a string: {}", name, other)),
    }
}

fn required_bool(fields: &[Value], idx: usize, name: &str) -> Result<bool> {
    fields[idx]
        .as_bool()
        .ok_or_else(|| anyhow!("{} is not a boolean: {}", name, fields[idx]))
}

fn optional_f64(fields: &[Value], idx: usize, name: &str) -> Result<Option<f64>> {
    match &fields[idx] {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_f64()
            .map(Some)
            .ok_or_else(|| anyhow!("{} is out of range: {}", name, n)),
        other => Err(anyhow!("{} is not a number: {}", name, other)),
    }
}
