//! Bounded TTL cache for directory listings.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use crate::ports::{CachedListing, DirectoryCache};

/// Default lifetime of a cached listing.
pub const DEFAULT_TTL: Duration = Duration::from_secs(3 * 60 * 60);

/// Default ceiling on the number of cached listings.
pub const DEFAULT_MAX_ENTRIES: usize = 1024;

#[derive(Debug, Clone)]
struct Entry {
    value: CachedListing,
    stored_at: Instant,
    ttl: Duration,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.stored_at) >= self.ttl
    }
}

/// Process-wide listing cache shared by every request of every event.
///
/// Eviction is purely time based until `max_entries` is reached; a `put` on a
/// full cache first drops expired entries, then the oldest stored one.
#[derive(Debug)]
pub struct TtlDirectoryCache {
    entries: DashMap<String, Entry>,
    max_entries: usize,
}

impl Default for TtlDirectoryCache {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES)
    }
}

impl TtlDirectoryCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            max_entries: max_entries.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes every expired entry and returns how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        before.saturating_sub(self.entries.len())
    }

    fn evict_oldest(&self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|entry| entry.stored_at)
            .map(|entry| entry.key().clone());
        if let Some(key) = oldest {
            self.entries.remove(&key);
            debug!(key = %key, "Evicted oldest directory listing");
        }
    }
}

#[async_trait]
impl DirectoryCache for TtlDirectoryCache {
    async fn get(&self, key: &str) -> Option<CachedListing> {
        let now = Instant::now();
        let hit = self
            .entries
            .get(key)
            .and_then(|entry| (!entry.is_expired(now)).then(|| entry.value.clone()));

        if hit.is_none() {
            self.entries.remove_if(key, |_, entry| entry.is_expired(now));
        }
        hit
    }

    async fn put(&self, key: &str, value: CachedListing, ttl: Duration) {
        let full = !self.entries.contains_key(key) && self.entries.len() >= self.max_entries;
        if full && self.purge_expired() == 0 {
            self.evict_oldest();
        }

        self.entries.insert(
            key.to_string(),
            Entry {
                value,
                stored_at: Instant::now(),
                ttl,
            },
        );
    }

    async fn invalidate(&self, key: &str) {
        self.entries.remove(key);
    }

    async fn invalidate_prefix(&self, prefix: &str) -> usize {
        let keys: Vec<String> = self
            .entries
            .iter()
            .filter(|entry| entry.key().starts_with(prefix))
            .map(|entry| entry.key().clone())
            .collect();

        keys.iter()
            .filter(|key| self.entries.remove(key.as_str()).is_some())
            .count()
    }
}
