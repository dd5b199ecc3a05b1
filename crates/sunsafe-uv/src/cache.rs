//! In-memory cache of UV lookups keyed by quantized coordinate.
//!
//! Stale entries are never evicted; a fresh fetch for the same key
//! overwrites them in place.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

use crate::types::{CacheKey, Coordinate, UvResponse};

/// How long a lookup stays fresh by default
pub const CACHE_DURATION: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: CacheKey,
    pub payload: UvResponse,
    pub stored_at: Instant,
}

#[derive(Debug)]
pub struct RequestCache {
    ttl: Duration,
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
}

impl Default for RequestCache {
    fn default() -> Self {
        Self::new(CACHE_DURATION)
    }
}

impl RequestCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Cached payload for the coordinate's key, if stored less than `ttl` ago.
    pub fn get(&self, coordinate: &Coordinate) -> Option<UvResponse> {
        let key = coordinate.cache_key();
        let entries = self.entries.lock();
        let entry = entries.get(&key)?;

        if entry.stored_at.elapsed() < self.ttl {
            tracing::debug!("UV cache hit for {}", key);
            Some(entry.payload.clone())
        } else {
            tracing::debug!("UV cache entry for {} is stale", key);
            None
        }
    }

    pub fn put(&self, coordinate: &Coordinate, payload: UvResponse) {
        let key = coordinate.cache_key();
        let entry = CacheEntry {
            key: key.clone(),
            payload,
            stored_at: Instant::now(),
        };
        self.entries.lock().insert(key, entry);
    }

    /// Number of stored entries, stale ones included.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
