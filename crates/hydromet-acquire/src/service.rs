//! Combined weather + discharge acquisition for downstream risk scoring.

use std::sync::Arc;

use futures_util::future::join_all;
use hydromet_core::Config;
use hydromet_services::{FetchError, Fetcher};
use serde::{Deserialize, Serialize};

use crate::cache::CacheStore;
use crate::discharge::DischargeKind;
use crate::provider::Provider;
use crate::types::{DischargeResult, WeatherResult};
use crate::weather::WeatherKind;

/// Upper bound on locations handled by one bulk call; extra entries are ignored
pub const MAX_BULK_LOCATIONS: usize = 50;

const DEGRADED_NOTICE: &str =
    "Data may be stale - network temporarily unavailable. Using cached/estimated values.";

/// A requested location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat,
            lon,
            district: None,
            state: None,
        }
    }
}

/// Overall trust in a combined response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Degraded,
}

/// Weather and discharge for one location
#[derive(Debug, Clone, Serialize)]
pub struct Conditions {
    pub status: Status,
    pub weather: WeatherResult,
    pub discharge: DischargeResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

impl Conditions {
    /// Degraded when either part did not come from a fresh fetch
    pub fn new(weather: WeatherResult, discharge: DischargeResult) -> Self {
        let degraded = weather.source.is_degraded() || discharge.source.is_degraded();
        Self {
            status: if degraded {
                Status::Degraded
            } else {
                Status::Success
            },
            weather,
            discharge,
            notice: degraded.then(|| DEGRADED_NOTICE.to_string()),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.status == Status::Degraded
    }
}

/// One entry of a bulk response
#[derive(Debug, Clone, Serialize)]
pub struct LocationConditions {
    pub location: Coordinate,
    #[serde(flatten)]
    pub conditions: Conditions,
}

/// Entry point for callers: both pipelines over a shared fetcher
pub struct Acquirer {
    weather: Provider<WeatherKind>,
    discharge: Provider<DischargeKind>,
}

impl Acquirer {
    pub fn new(weather: Provider<WeatherKind>, discharge: Provider<DischargeKind>) -> Self {
        Self { weather, discharge }
    }

    /// Build both pipelines from configuration, each with its own cache
    pub fn from_config(config: &Config) -> Result<Self, FetchError> {
        let fetcher = Fetcher::from_config(&config.upstream, &config.retry)?;

        let weather = Provider::new(
            WeatherKind::from_config(&config.upstream),
            fetcher.clone(),
            Arc::new(CacheStore::with_capacity_limit(config.cache.capacity)),
        );
        let discharge = Provider::new(
            DischargeKind::from_config(&config.upstream),
            fetcher,
            Arc::new(CacheStore::with_capacity_limit(config.cache.capacity)),
        );

        Ok(Self::new(weather, discharge))
    }

    pub fn weather(&self) -> &Provider<WeatherKind> {
        &self.weather
    }

    pub fn discharge(&self) -> &Provider<DischargeKind> {
        &self.discharge
    }

    /// Never fails; check `source` for provenance
    pub async fn acquire_weather(&self, lat: f64, lon: f64) -> WeatherResult {
        self.weather.acquire(lat, lon).await
    }

    /// Never fails; check `source` for provenance
    pub async fn acquire_discharge(&self, lat: f64, lon: f64) -> DischargeResult {
        self.discharge.acquire(lat, lon).await
    }

    /// Fetch weather and discharge concurrently
    pub async fn acquire_conditions(&self, lat: f64, lon: f64) -> Conditions {
        let (weather, discharge) = tokio::join!(
            self.weather.acquire(lat, lon),
            self.discharge.acquire(lat, lon)
        );
        tracing::info!(
            lat,
            lon,
            rainfall_24h = weather.rainfall_24h,
            soil_moisture = weather.soil_moisture,
            weather_source = %weather.source,
            current_discharge = discharge.current_discharge,
            discharge_source = %discharge.source,
            "Acquired conditions"
        );
        Conditions::new(weather, discharge)
    }

    /// Acquire conditions for up to [`MAX_BULK_LOCATIONS`] locations concurrently
    pub async fn acquire_bulk(&self, locations: &[Coordinate]) -> Vec<LocationConditions> {
        if locations.len() > MAX_BULK_LOCATIONS {
            tracing::warn!(
                requested = locations.len(),
                limit = MAX_BULK_LOCATIONS,
                "Bulk request truncated"
            );
        }

        let tasks = locations
            .iter()
            .take(MAX_BULK_LOCATIONS)
            .map(|location| async move {
                LocationConditions {
                    location: location.clone(),
                    conditions: self.acquire_conditions(location.lat, location.lon).await,
                }
            });

        join_all(tasks).await
    }
}
