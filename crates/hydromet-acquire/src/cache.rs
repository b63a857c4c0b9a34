//! In-memory fallback cache keyed by grid cell.
//!
//! Holds the last successful result per cell for the life of the process.
//! The store never judges staleness; it only remembers.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::types::SpatialKey;

/// A cached payload and the moment it was stored
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub payload: T,
    pub captured_at: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
    /// Time elapsed since the entry was stored
    pub fn age(&self) -> chrono::Duration {
        Utc::now() - self.captured_at
    }

    pub fn into_payload(self) -> T {
        self.payload
    }
}

/// Thread-safe map from grid cell to last known result.
///
/// Unbounded unless built with [`CacheStore::bounded`], in which case adding
/// a new cell at capacity evicts the cell with the oldest capture time.
#[derive(Debug)]
pub struct CacheStore<T> {
    entries: RwLock<HashMap<SpatialKey, CacheEntry<T>>>,
    capacity: Option<usize>,
}

impl<T: Clone> CacheStore<T> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            capacity: None,
        }
    }

    /// Store holding at most `capacity` cells (at least one)
    pub fn bounded(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            capacity: Some(capacity.max(1)),
        }
    }

    /// Build from an optional capacity setting
    pub fn with_capacity_limit(capacity: Option<usize>) -> Self {
        match capacity {
            Some(c) => Self::bounded(c),
            None => Self::new(),
        }
    }

    pub fn get(&self, key: &SpatialKey) -> Option<CacheEntry<T>> {
        self.entries.read().get(key).cloned()
    }

    /// Store `payload` for `key`, replacing whatever was there
    pub fn put(&self, key: SpatialKey, payload: T) {
        let entry = CacheEntry {
            payload,
            captured_at: Utc::now(),
        };

        let mut entries = self.entries.write();
        if let Some(capacity) = self.capacity {
            if entries.len() >= capacity && !entries.contains_key(&key) {
                let oldest = entries
                    .iter()
                    .min_by_key(|(_, e)| e.captured_at)
                    .map(|(k, _)| *k);
                if let Some(oldest) = oldest {
                    tracing::debug!(evicted = %oldest, "Cache at capacity, evicting oldest cell");
                    entries.remove(&oldest);
                }
            }
        }
        entries.insert(key, entry);
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }
}

impl<T: Clone> Default for CacheStore<T> {
    fn default() -> Self {
        Self::new()
    }
}
