//! Fresh → cached → default acquisition, shared by every data kind.

use std::sync::Arc;

use hydromet_services::Fetcher;
use serde_json::Value;
use tracing::Instrument;

use crate::cache::CacheStore;
use crate::types::{AcquireError, Provenance, Source, SpatialKey};

/// What differs between pipelines: upstream request, payload shape, defaults
pub trait DataKind: Send + Sync {
    type Output: Provenance + Clone + Send + Sync;

    /// Label used in log events
    fn name(&self) -> &'static str;

    fn endpoint(&self) -> String;

    fn params(&self, lat: f64, lon: f64) -> Vec<(&'static str, String)>;

    /// Normalize a raw upstream payload into a `live` result
    fn normalize(&self, lat: f64, lon: f64, raw: Value) -> Result<Self::Output, AcquireError>;

    /// Safe default tagged `unavailable`, carrying the failure message
    fn unavailable(&self, lat: f64, lon: f64, error: String) -> Self::Output;
}

/// Acquisition pipeline for one data kind.
///
/// `acquire` never fails: a fresh fetch is written through to the cache;
/// on failure the last cached result for the grid cell is replayed however
/// old it is; with nothing cached the kind's safe default is returned.
pub struct Provider<K: DataKind> {
    kind: K,
    fetcher: Fetcher,
    cache: Arc<CacheStore<K::Output>>,
}

impl<K: DataKind> Provider<K> {
    pub fn new(kind: K, fetcher: Fetcher, cache: Arc<CacheStore<K::Output>>) -> Self {
        Self {
            kind,
            fetcher,
            cache,
        }
    }

    pub fn cache(&self) -> &Arc<CacheStore<K::Output>> {
        &self.cache
    }

    /// Acquire data for a coordinate. Always yields a complete result.
    pub async fn acquire(&self, lat: f64, lon: f64) -> K::Output {
        let key = SpatialKey::new(lat, lon);
        // Enabled whenever retry warnings are, so they carry kind and key
        let span = tracing::warn_span!("acquire", kind = self.kind.name(), key = %key);

        async {
            match self.fetch_fresh(lat, lon).await {
                Ok(mut result) => {
                    result.set_source(Source::Live);
                    self.cache.put(key, result.clone());
                    tracing::debug!("Stored fresh result");
                    result
                }
                Err(e) => self.fall_back(key, lat, lon, e),
            }
        }
        .instrument(span)
        .await
    }

    async fn fetch_fresh(&self, lat: f64, lon: f64) -> Result<K::Output, AcquireError> {
        let raw = self
            .fetcher
            .fetch(&self.kind.endpoint(), &self.kind.params(lat, lon))
            .await?;
        self.kind.normalize(lat, lon, raw)
    }

    fn fall_back(&self, key: SpatialKey, lat: f64, lon: f64, error: AcquireError) -> K::Output {
        if let Some(entry) = self.cache.get(&key) {
            tracing::warn!(
                kind = self.kind.name(),
                key = %key,
                reason = %error,
                age_secs = entry.age().num_seconds(),
                "Upstream failed, using cached data"
            );
            let mut cached = entry.into_payload();
            cached.set_source(Source::Cached);
            return cached;
        }

        tracing::warn!(
            kind = self.kind.name(),
            key = %key,
            reason = %error,
            "Upstream failed and nothing cached, using defaults"
        );
        let mut fallback = self.kind.unavailable(lat, lon, error.to_string());
        fallback.set_source(Source::Unavailable);
        fallback
    }
}
