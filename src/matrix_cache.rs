//! Time-bounded cache of travel matrices.
//!
//! Owned by the caller and shared between planning runs through an `Arc`;
//! nothing here is process-global.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde::Deserialize;
use tracing::debug;

use crate::model::{Location, Matrix};
use crate::traits::{Clock, SystemClock};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MatrixCacheConfig {
    pub ttl_secs: u64,
    pub max_entries: usize,
}

impl Default for MatrixCacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 600,
            max_entries: 64,
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    matrix: Matrix,
    expires_at: Instant,
}

pub struct MatrixCache {
    ttl: Duration,
    max_entries: usize,
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl MatrixCache {
    pub fn new(config: &MatrixCacheConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &MatrixCacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl: Duration::from_secs(config.ttl_secs),
            max_entries: config.max_entries.max(1),
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns a live entry; expired entries are dropped on the way.
    pub fn get(&self, key: &str) -> Option<Matrix> {
        let now = self.clock.now();
        let mut entries = self.lock();
        match entries.get(key) {
            Some(entry) if entry.expires_at > now => Some(entry.matrix.clone()),
            Some(_) => {
                debug!(key, "matrix cache entry expired");
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Stores a matrix with a fresh expiry. Last writer wins.
    pub fn insert(&self, key: String, matrix: Matrix) {
        let now = self.clock.now();
        let mut entries = self.lock();

        entries.retain(|_, entry| entry.expires_at > now);
        if !entries.contains_key(&key) && entries.len() >= self.max_entries {
            let oldest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.expires_at)
                .map(|(key, _)| key.clone());
            if let Some(oldest) = oldest {
                debug!(key = %oldest, "evicting matrix cache entry");
                entries.remove(&oldest);
            }
        }

        entries.insert(
            key,
            CacheEntry {
                matrix,
                expires_at: now + self.ttl,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    // A poisoned lock only means another run panicked mid-insert; the map
    // itself is still consistent.
    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Cache key for a day and an ordered coordinate list, rounded to five
/// decimals (about a metre).
pub fn cache_key(day_key: &str, locations: &[Location]) -> String {
    let coords = locations
        .iter()
        .map(|location| format!("{:.5},{:.5}", location.lat, location.lng))
        .collect::<Vec<_>>()
        .join(";");
    format!("{}|{}", day_key, coords)
}
