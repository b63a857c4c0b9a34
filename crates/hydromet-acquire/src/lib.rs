//! Resilient acquisition of weather and river discharge data.
//!
//! Every `acquire` call yields a structurally complete result: fresh from
//! upstream when possible, otherwise the last cached result for the grid
//! cell, otherwise safe defaults. The `source` field says which.

pub mod cache;
pub mod discharge;
pub mod provider;
pub mod service;
pub mod types;
pub mod weather;

pub use cache::{CacheEntry, CacheStore};
pub use discharge::{normalize_flood, DischargeKind};
pub use provider::{DataKind, Provider};
pub use service::{
    Acquirer, Conditions, Coordinate, LocationConditions, Status, MAX_BULK_LOCATIONS,
};
pub use types::*;
pub use weather::{normalize_forecast, WeatherKind};
