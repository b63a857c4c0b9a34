use chrono::{DateTime, Utc};
use hydromet_services::FetchError;
use serde::{Deserialize, Serialize};

/// Where a result came from. The only signal callers need to judge trust.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// Fetched from upstream during this request
    Live,
    /// Replayed from the last successful fetch for the grid cell
    Cached,
    /// Safe defaults; upstream failed and nothing was cached
    Unavailable,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::Cached => "cached",
            Self::Unavailable => "unavailable",
        }
    }

    /// Cached and default data both count as degraded
    pub fn is_degraded(&self) -> bool {
        !matches!(self, Self::Live)
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Results that carry a provenance tag
pub trait Provenance {
    fn source(&self) -> Source;
    fn set_source(&mut self, source: Source);
}

/// Coordinate snapped to a 0.01 degree grid cell (~1.1 km).
///
/// Coordinates are floored to the cell, not rounded to the nearest
/// hundredth: every coordinate in `[12.34, 12.35)` maps to `12.34`, so
/// `12.345` and `12.349` share a key. `Display` renders the cell's
/// south-west corner (`12.34,77.45`), not the rounded input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpatialKey {
    lat_cell: i64,
    lon_cell: i64,
}

impl SpatialKey {
    /// Grid cells per degree
    pub const CELLS_PER_DEGREE: f64 = 100.0;

    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat_cell: snap(lat),
            lon_cell: snap(lon),
        }
    }

    /// South-west corner of the cell
    pub fn lat(&self) -> f64 {
        self.lat_cell as f64 / Self::CELLS_PER_DEGREE
    }

    pub fn lon(&self) -> f64 {
        self.lon_cell as f64 / Self::CELLS_PER_DEGREE
    }
}

// The epsilon absorbs representation error such as 0.29 * 100 = 28.999999999999996.
fn snap(degrees: f64) -> i64 {
    (degrees * SpatialKey::CELLS_PER_DEGREE + 1e-9).floor() as i64
}

impl std::fmt::Display for SpatialKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2},{:.2}", self.lat(), self.lon())
    }
}

/// Normalized weather for one location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherResult {
    pub lat: f64,
    pub lon: f64,
    /// Air temperature at 2 m, °C
    pub temperature: f64,
    /// Relative humidity at 2 m, %
    pub humidity: f64,
    /// Current precipitation, mm
    pub current_precipitation: f64,
    pub current_rain: f64,
    /// Wind speed at 10 m, km/h
    pub wind_speed: f64,
    pub weather_code: i32,
    /// Rain over the 24 h before now, mm
    pub rainfall_24h: f64,
    /// Rain over the 7 days before now, mm
    pub rainfall_7d: f64,
    /// Latest volumetric soil moisture, 0-1 cm layer, m³/m³
    pub soil_moisture: f64,
    pub daily_precipitation: Vec<Option<f64>>,
    pub daily_dates: Vec<String>,
    pub source: Source,
    pub fetched_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Provenance for WeatherResult {
    fn source(&self) -> Source {
        self.source
    }

    fn set_source(&mut self, source: Source) {
        self.source = source;
    }
}

/// Normalized river discharge for one location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DischargeResult {
    pub lat: f64,
    pub lon: f64,
    /// Latest reported discharge, m³/s
    pub current_discharge: f64,
    pub max_discharge_7d: f64,
    pub avg_discharge_7d: f64,
    /// Raw daily series, past and forecast days
    pub discharge_trend: Vec<Option<f64>>,
    pub dates: Vec<String>,
    pub source: Source,
    pub fetched_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Provenance for DischargeResult {
    fn source(&self) -> Source {
        self.source
    }

    fn set_source(&mut self, source: Source) {
        self.source = source;
    }
}

/// Acquisition errors. Never returned to `acquire` callers; they only
/// decide which fallback tier is used and end up in the `error` field.
#[derive(Debug, thiserror::Error)]
pub enum AcquireError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("Malformed {kind} payload: {message}")]
    Payload { kind: &'static str, message: String },
}

/// Round to a fixed number of decimal places
pub(crate) fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
