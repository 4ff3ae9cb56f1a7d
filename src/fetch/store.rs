//! Keyed TTL cache over an LRU map.
//!
//! Expired entries are retained (until evicted by capacity) so the fetcher
//! can serve them as last-known-good when the upstream is down.

use std::sync::RwLock;
use std::time::{Duration, Instant};

use lru::LruCache;
use metrics::counter;

use super::config::FetchConfig;
use super::sync::write_guard;

/// Outcome of a cache probe.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    /// Entry exists and is within its TTL.
    Fresh(T),
    /// Entry exists but its TTL has lapsed; usable as last-known-good.
    Stale(T),
    Miss,
}

struct Entry<T> {
    value: T,
    inserted_at: Instant,
}

/// Per-provider TTL store.
pub struct TtlStore<T> {
    provider: &'static str,
    ttl: Duration,
    entries: RwLock<LruCache<String, Entry<T>>>,
}

impl<T: Clone> TtlStore<T> {
    pub fn new(provider: &'static str, config: &FetchConfig) -> Self {
        Self {
            provider,
            ttl: config.ttl,
            entries: RwLock::new(LruCache::new(config.capacity)),
        }
    }

    pub fn lookup(&self, key: &str) -> Lookup<T> {
        // LruCache::get reorders internally, so even probes take the write lock.
        let mut entries = write_guard(&self.entries, "store.lookup");
        match entries.get(key) {
            Some(entry) if entry.inserted_at.elapsed() < self.ttl => {
                counter!("ecodash_fetch_hit_total", "provider" => self.provider).increment(1);
                Lookup::Fresh(entry.value.clone())
            }
            Some(entry) => Lookup::Stale(entry.value.clone()),
            None => {
                counter!("ecodash_fetch_miss_total", "provider" => self.provider).increment(1);
                Lookup::Miss
            }
        }
    }

    pub fn insert(&self, key: String, value: T) {
        write_guard(&self.entries, "store.insert").put(
            key,
            Entry {
                value,
                inserted_at: Instant::now(),
            },
        );
    }

    pub fn invalidate_all(&self) {
        write_guard(&self.entries, "store.invalidate_all").clear();
    }

    pub fn len(&self) -> usize {
        write_guard(&self.entries, "store.len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
