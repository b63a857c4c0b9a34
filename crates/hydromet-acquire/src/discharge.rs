//! River discharge pipeline: Open-Meteo flood API (GloFAS), daily series.

use chrono::{DateTime, Utc};
use hydromet_core::UpstreamConfig;
use serde::Deserialize;
use serde_json::Value;

use crate::provider::DataKind;
use crate::types::{round_to, AcquireError, DischargeResult, Source};
use crate::weather::last_present;

const PAST_DAYS: u32 = 7;
const FORECAST_DAYS: u32 = 3;

#[derive(Debug, Default, Deserialize)]
struct FloodResponse {
    #[serde(default)]
    daily: Option<FloodDaily>,
}

#[derive(Debug, Default, Deserialize)]
struct FloodDaily {
    time: Option<Vec<String>>,
    river_discharge: Option<Vec<Option<f64>>>,
}

/// Strategy for the discharge pipeline
#[derive(Debug, Clone)]
pub struct DischargeKind {
    base_url: String,
}

impl DischargeKind {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    pub fn from_config(upstream: &UpstreamConfig) -> Self {
        Self::new(&upstream.flood_base_url)
    }
}

impl DataKind for DischargeKind {
    type Output = DischargeResult;

    fn name(&self) -> &'static str {
        "discharge"
    }

    fn endpoint(&self) -> String {
        format!("{}/flood", self.base_url.trim_end_matches('/'))
    }

    fn params(&self, lat: f64, lon: f64) -> Vec<(&'static str, String)> {
        vec![
            ("latitude", lat.to_string()),
            ("longitude", lon.to_string()),
            ("daily", "river_discharge".to_string()),
            ("past_days", PAST_DAYS.to_string()),
            ("forecast_days", FORECAST_DAYS.to_string()),
        ]
    }

    fn normalize(&self, lat: f64, lon: f64, raw: Value) -> Result<DischargeResult, AcquireError> {
        normalize_flood(lat, lon, raw, Utc::now())
    }

    fn unavailable(&self, lat: f64, lon: f64, error: String) -> DischargeResult {
        DischargeResult {
            lat,
            lon,
            current_discharge: 0.0,
            max_discharge_7d: 0.0,
            avg_discharge_7d: 0.0,
            discharge_trend: Vec::new(),
            dates: Vec::new(),
            source: Source::Unavailable,
            fetched_at: Utc::now(),
            error: Some(error),
        }
    }
}

/// Turn a raw flood payload into a [`DischargeResult`] tagged `live`.
///
/// Aggregates cover every non-null sample in the series, forecast days included.
pub fn normalize_flood(
    lat: f64,
    lon: f64,
    raw: Value,
    fetched_at: DateTime<Utc>,
) -> Result<DischargeResult, AcquireError> {
    let response: FloodResponse =
        serde_json::from_value(raw).map_err(|e| AcquireError::Payload {
            kind: "discharge",
            message: e.to_string(),
        })?;

    let daily = response.daily.unwrap_or_default();
    let series = daily.river_discharge.unwrap_or_default();
    let present: Vec<f64> = series.iter().flatten().copied().collect();

    let max_discharge = present.iter().copied().reduce(f64::max).unwrap_or(0.0);
    let avg_discharge = if present.is_empty() {
        0.0
    } else {
        round_to(present.iter().sum::<f64>() / present.len() as f64, 2)
    };

    Ok(DischargeResult {
        lat,
        lon,
        current_discharge: last_present(&series).unwrap_or(0.0),
        max_discharge_7d: max_discharge,
        avg_discharge_7d: avg_discharge,
        discharge_trend: series,
        dates: daily.time.unwrap_or_default(),
        source: Source::Live,
        fetched_at,
        error: None,
    })
}
