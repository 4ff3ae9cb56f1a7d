use std::num::NonZeroUsize;
use std::time::Duration;

pub const DEFAULT_TTL_SECS: u64 = 300;
pub const DEFAULT_CAPACITY: usize = 256;
pub const DEFAULT_MIN_INTERVAL_MS: u64 = 1_000;
pub const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 20;

/// Tuning for one upstream provider's fetch pipeline.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// How long a cache entry counts as fresh.
    pub ttl: Duration,
    /// Bound on retained entries; beyond it the least recently used entry
    /// (including last-known-good values) is dropped.
    pub capacity: NonZeroUsize,
    /// Minimum spacing between upstream departures.
    pub min_interval: Duration,
    /// Hard ceiling on a single upstream call.
    pub upstream_timeout: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(DEFAULT_TTL_SECS),
            capacity: const { NonZeroUsize::new(DEFAULT_CAPACITY).unwrap() },
            min_interval: Duration::from_millis(DEFAULT_MIN_INTERVAL_MS),
            upstream_timeout: Duration::from_secs(DEFAULT_UPSTREAM_TIMEOUT_SECS),
        }
    }
}
