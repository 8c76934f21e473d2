//! Terminal dashboard over the query API
//!
//! Fetches the latest batch from a running API server and renders a short
//! KPI summary plus a table of flights.

use anyhow::{Context, Result};
use reqwest::Client;
use std::time::Duration;

use crate::actions::RefreshResponse;
use crate::flight_query::LatestBatch;
use crate::flights::FlightRecord;

/// Headline numbers for the latest batch
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardSummary {
    pub flight_count: usize,
    /// Mean barometric altitude in metres, truncated
    pub average_altitude_m: i64,
    /// Highest ground speed in km/h, truncated
    pub max_speed_kmh: i64,
}

impl DashboardSummary {
    /// Compute the KPIs, or `None` when there is nothing to show
    ///
    /// Missing velocity and altitude count as zero here. This zero-fill is for
    /// display only; stored values stay absent.
    pub fn from_batch(batch: &LatestBatch) -> Option<Self> {
        if batch.count == 0 || batch.data.is_empty() {
            return None;
        }

        let altitudes: Vec<f64> = batch
            .data
            .iter()
            .map(|f| f.baro_altitude.unwrap_or(0.0))
            .collect();
        let average = altitudes.iter().sum::<f64>() / altitudes.len() as f64;

        let max_velocity = batch
            .data
            .iter()
            .map(|f| f.velocity.unwrap_or(0.0))
            .fold(f64::MIN, f64::max);

        Some(Self {
            flight_count: batch.count,
            average_altitude_m: average as i64,
            max_speed_kmh: (max_velocity * 3.6) as i64,
        })
    }
}

fn display_value(value: Option<f64>) -> String {
    format!("{:.1}", value.unwrap_or(0.0))
}

/// Render the summary and flight table as plain text
pub fn render(batch: &LatestBatch) -> String {
    let Some(summary) = DashboardSummary::from_batch(batch) else {
        return "No flight data available at the moment. Please check that the ingester is running.\n"
            .to_string();
    };

    let mut out = String::from("Swiss Air Traffic Tracker\n");
    if let Some(latest) = batch.latest_ingestion {
        out.push_str(&format!("Snapshot: {}\n", latest.to_rfc3339()));
    }
    out.push_str(&format!(
        "\nNumber of flights: {}\nAverage altitude:  {} m\nMax speed:         {} km/h\n\n",
        summary.flight_count, summary.average_altitude_m, summary.max_speed_kmh
    ));
    out.push_str(&format!(
        "{:<10} {:<24} {:>10} {:>12} {:>9}\n",
        "CALLSIGN", "COUNTRY", "VELOCITY", "ALTITUDE", "ON_GROUND"
    ));
    for flight in &batch.data {
        out.push_str(&table_row(flight));
        out.push('\n');
    }
    out
}

fn table_row(flight: &FlightRecord) -> String {
    format!(
        "{:<10} {:<24} {:>10} {:>12} {:>9}",
        flight.callsign,
        flight.origin_country,
        display_value(flight.velocity),
        display_value(flight.baro_altitude),
        flight.on_ground
    )
}

/// Thin client for the query API
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub async fn latest(&self) -> Result<LatestBatch> {
        let url = format!("{}/flights/latest", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Unable to contact API at {}", url))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("API returned {}: {}", status, body);
        }

        response
            .json()
            .await
            .context("Failed to parse latest flights response")
    }

    pub async fn refresh(&self) -> Result<RefreshResponse> {
        let url = format!("{}/flights/refresh", self.base_url);
        let response = self
            .client
            .post(&url)
            .send()
            .await
            .with_context(|| format!("Failed to contact API for refresh at {}", url))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Error refreshing data ({}): {}", status, body);
        }

        response
            .json()
            .await
            .context("Failed to parse refresh response")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn record(velocity: Option<f64>, altitude: Option<f64>) -> FlightRecord {
        FlightRecord {
            callsign: "SWR123".to_string(),
            origin_country: "Switzerland".to_string(),
            longitude: Some(8.5),
            latitude: Some(47.4),
            velocity,
            baro_altitude: altitude,
            on_ground: false,
            ingestion_time: Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap(),
        }
    }

    fn batch(data: Vec<FlightRecord>) -> LatestBatch {
        LatestBatch {
            latest_ingestion: data.first().map(|r| r.ingestion_time),
            count: data.len(),
            data,
        }
    }

    #[test]
    fn test_summary_zero_fills_missing_values() {
        let latest = batch(vec![
            record(Some(200.0), Some(3000.0)),
            record(None, None),
            record(Some(100.0), Some(1500.0)),
        ]);

        let summary = DashboardSummary::from_batch(&latest).unwrap();

        assert_eq!(summary.flight_count, 3);
        assert_eq!(summary.average_altitude_m, 1500);
        assert_eq!(summary.max_speed_kmh, 720);
        // Display fill does not touch the records
        assert_eq!(latest.data[1].velocity, None);
    }

    #[test]
    fn test_empty_batch_has_no_summary() {
        assert_eq!(DashboardSummary::from_batch(&LatestBatch::empty()), None);
        assert!(render(&LatestBatch::empty()).starts_with("No flight data"));
    }

    #[test]
    fn test_render_lists_each_flight() {
        let latest = batch(vec![record(Some(230.5), None)]);
        let text = render(&latest);

        assert!(text.contains("Number of flights: 1"));
        assert!(text.contains("Max speed:         829 km/h"));
        assert!(text.contains("SWR123"));
        assert!(text.contains("230.5"));
        assert!(text.contains("2025-03-01T12:00:00+00:00"));
    }
}
