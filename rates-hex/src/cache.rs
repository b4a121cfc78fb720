//! In-memory response cache.
//!
//! First tier of the read path: resolved responses keyed by the request's
//! cache key, each entry carrying its own deadline. Expired entries are
//! treated as absent on read and reaped in bulk by the periodic sweep job.

use std::time::{Duration, Instant};

use dashmap::DashMap;

use rates_types::domain::RateResponse;

struct CacheEntry {
    response: RateResponse,
    expires_at: Instant,
}

/// Concurrent TTL cache shared between the resolver and the sweep job.
pub struct MemoryCache {
    entries: DashMap<String, CacheEntry>,
    ttl: Duration,
}

impl MemoryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Returns a clone of the live entry under `key`, dropping it if its
    /// deadline has passed.
    pub fn get(&self, key: &str) -> Option<RateResponse> {
        let entry = self.entries.get(key)?;
        if Instant::now() >= entry.expires_at {
            drop(entry);
            self.entries.remove(key);
            None
        } else {
            Some(entry.response.clone())
        }
    }

    /// Stores `response` under `key` with the standard TTL, replacing any
    /// previous entry.
    pub fn put(&self, key: String, response: RateResponse) {
        self.entries.insert(
            key,
            CacheEntry {
                response,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    /// Drops every expired entry. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let before = self.entries.len();
        let now = Instant::now();
        self.entries.retain(|_, entry| entry.expires_at > now);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
