//! Weather pipeline: Open-Meteo forecast API with 7 past and 3 forecast days.

use chrono::{DateTime, Utc};
use hydromet_core::UpstreamConfig;
use serde::Deserialize;
use serde_json::Value;

use crate::provider::DataKind;
use crate::types::{round_to, AcquireError, Source, WeatherResult};

const CURRENT_FIELDS: &str =
    "temperature_2m,relative_humidity_2m,precipitation,rain,weather_code,wind_speed_10m";
const HOURLY_FIELDS: &str = "precipitation,soil_moisture_0_to_1cm,temperature_2m";
const DAILY_FIELDS: &str = "precipitation_sum,rain_sum";
const PAST_DAYS: u32 = 7;
const FORECAST_DAYS: u32 = 3;

/// Hourly samples after "now" in the series
const FORECAST_HOURS: usize = FORECAST_DAYS as usize * 24;
const HOURS_24: usize = 24;
const HOURS_7D: usize = PAST_DAYS as usize * 24;

#[derive(Debug, Default, Deserialize)]
struct ForecastResponse {
    #[serde(default)]
    current: Option<CurrentBlock>,
    #[serde(default)]
    hourly: Option<HourlyBlock>,
    #[serde(default)]
    daily: Option<DailyBlock>,
}

#[derive(Debug, Default, Deserialize)]
struct CurrentBlock {
    temperature_2m: Option<f64>,
    relative_humidity_2m: Option<f64>,
    precipitation: Option<f64>,
    rain: Option<f64>,
    weather_code: Option<f64>,
    wind_speed_10m: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct HourlyBlock {
    precipitation: Option<Vec<Option<f64>>>,
    soil_moisture_0_to_1cm: Option<Vec<Option<f64>>>,
}

#[derive(Debug, Default, Deserialize)]
struct DailyBlock {
    time: Option<Vec<String>>,
    precipitation_sum: Option<Vec<Option<f64>>>,
}

/// Strategy for the weather pipeline
#[derive(Debug, Clone)]
pub struct WeatherKind {
    base_url: String,
    timezone: String,
}

impl WeatherKind {
    pub fn new(base_url: impl Into<String>, timezone: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timezone: timezone.into(),
        }
    }

    pub fn from_config(upstream: &UpstreamConfig) -> Self {
        Self::new(&upstream.forecast_base_url, &upstream.timezone)
    }
}

impl DataKind for WeatherKind {
    type Output = WeatherResult;

    fn name(&self) -> &'static str {
        "weather"
    }

    fn endpoint(&self) -> String {
        format!("{}/forecast", self.base_url.trim_end_matches('/'))
    }

    fn params(&self, lat: f64, lon: f64) -> Vec<(&'static str, String)> {
        vec![
            ("latitude", lat.to_string()),
            ("longitude", lon.to_string()),
            ("current", CURRENT_FIELDS.to_string()),
            ("hourly", HOURLY_FIELDS.to_string()),
            ("daily", DAILY_FIELDS.to_string()),
            ("timezone", self.timezone.clone()),
            ("forecast_days", FORECAST_DAYS.to_string()),
            ("past_days", PAST_DAYS.to_string()),
        ]
    }

    fn normalize(&self, lat: f64, lon: f64, raw: Value) -> Result<WeatherResult, AcquireError> {
        normalize_forecast(lat, lon, raw, Utc::now())
    }

    fn unavailable(&self, lat: f64, lon: f64, error: String) -> WeatherResult {
        WeatherResult {
            lat,
            lon,
            temperature: 28.0,
            humidity: 70.0,
            current_precipitation: 0.0,
            current_rain: 0.0,
            wind_speed: 5.0,
            weather_code: 0,
            rainfall_24h: 0.0,
            rainfall_7d: 0.0,
            soil_moisture: 0.2,
            daily_precipitation: Vec::new(),
            daily_dates: Vec::new(),
            source: Source::Unavailable,
            fetched_at: Utc::now(),
            error: Some(error),
        }
    }
}

/// Turn a raw forecast payload into a [`WeatherResult`] tagged `live`.
pub fn normalize_forecast(
    lat: f64,
    lon: f64,
    raw: Value,
    fetched_at: DateTime<Utc>,
) -> Result<WeatherResult, AcquireError> {
    let response: ForecastResponse =
        serde_json::from_value(raw).map_err(|e| AcquireError::Payload {
            kind: "weather",
            message: e.to_string(),
        })?;

    let current = response.current.unwrap_or_default();
    let hourly = response.hourly.unwrap_or_default();
    let daily = response.daily.unwrap_or_default();

    let precipitation = hourly.precipitation.unwrap_or_default();
    let soil = hourly.soil_moisture_0_to_1cm.unwrap_or_default();

    let rainfall_24h = sum_present(past_window(&precipitation, HOURS_24));
    let rainfall_7d = sum_present(past_window(&precipitation, HOURS_7D));
    let soil_moisture = last_present(&soil).unwrap_or(0.0);

    Ok(WeatherResult {
        lat,
        lon,
        temperature: current.temperature_2m.unwrap_or(0.0),
        humidity: current.relative_humidity_2m.unwrap_or(0.0),
        current_precipitation: current.precipitation.unwrap_or(0.0),
        current_rain: current.rain.unwrap_or(0.0),
        wind_speed: current.wind_speed_10m.unwrap_or(0.0),
        weather_code: current.weather_code.unwrap_or(0.0) as i32,
        rainfall_24h: round_to(rainfall_24h, 1),
        rainfall_7d: round_to(rainfall_7d, 1),
        soil_moisture: round_to(soil_moisture, 4),
        daily_precipitation: daily.precipitation_sum.unwrap_or_default(),
        daily_dates: daily.time.unwrap_or_default(),
        source: Source::Live,
        fetched_at,
        error: None,
    })
}

/// The `hours` samples ending where the forecast part of the series begins.
///
/// A series with no past part yields an empty window.
fn past_window(series: &[Option<f64>], hours: usize) -> &[Option<f64>] {
    let now_idx = series.len().saturating_sub(FORECAST_HOURS);
    &series[now_idx.saturating_sub(hours)..now_idx]
}

fn sum_present(samples: &[Option<f64>]) -> f64 {
    samples.iter().flatten().sum()
}

pub(crate) fn last_present(samples: &[Option<f64>]) -> Option<f64> {
    samples.iter().rev().find_map(|s| *s)
}
