//! Resilience layer in front of external data providers.
//!
//! Every upstream read goes through a [`Fetcher`], which layers a keyed TTL
//! cache, single-flight coalescing, a minimum-interval rate gate, and a
//! bounded timeout, and falls back to last-known-good or synthetic sample
//! data when the provider misbehaves.

pub mod config;
mod flight;
mod limiter;
mod store;
pub(crate) mod sync;

use std::sync::Arc;

use metrics::counter;
use serde::Serialize;
use tracing::warn;

pub use config::FetchConfig;
pub use limiter::MinIntervalLimiter;
pub use store::{Lookup, TtlStore};

use crate::infra::error::InfraError;
use flight::FlightGroup;

/// Where a served payload came from, reported back to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Served {
    /// Fetched from the upstream on this request.
    Fresh,
    /// Within TTL, no upstream call made.
    Cached,
    /// Upstream failed; expired cache entry served as last-known-good.
    Stale,
    /// Upstream failed with nothing cached; synthetic sample served.
    Sample,
}

impl Served {
    pub fn as_str(&self) -> &'static str {
        match self {
            Served::Fresh => "fresh",
            Served::Cached => "cached",
            Served::Stale => "stale",
            Served::Sample => "sample",
        }
    }
}

/// Caching, coalescing, rate-limited front for one provider.
pub struct Fetcher<T> {
    provider: &'static str,
    config: FetchConfig,
    store: TtlStore<T>,
    limiter: Arc<MinIntervalLimiter>,
    flights: FlightGroup<(T, Served)>,
}

impl<T: Clone> Fetcher<T> {
    pub fn new(provider: &'static str, config: FetchConfig) -> Self {
        let limiter = Arc::new(MinIntervalLimiter::new(config.min_interval));
        Self::with_limiter(provider, config, limiter)
    }

    /// Build a fetcher that shares its departure gate with sibling fetchers,
    /// so several endpoints of one provider respect a single rate limit.
    pub fn with_limiter(
        provider: &'static str,
        config: FetchConfig,
        limiter: Arc<MinIntervalLimiter>,
    ) -> Self {
        Self {
            provider,
            store: TtlStore::new(provider, &config),
            limiter,
            flights: FlightGroup::new(provider),
            config,
        }
    }

    pub fn provider(&self) -> &'static str {
        self.provider
    }

    /// Serve `key`, calling `upstream` only when the cache cannot answer.
    ///
    /// `upstream` returning `Ok(None)` means the provider answered with an
    /// empty payload; it is treated like a failure for fallback purposes but
    /// logged at a lower level. `sample` must be infallible and is only
    /// invoked when there is no cached value at all.
    pub async fn fetch<F, Fut, S>(&self, key: String, upstream: F, sample: S) -> (T, Served)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<T>, InfraError>>,
        S: FnOnce() -> T,
    {
        if let Lookup::Fresh(value) = self.store.lookup(&key) {
            return (value, Served::Cached);
        }

        let flight_key = key.clone();
        self.flights
            .run(&flight_key, || async move {
                // Another caller may have refreshed the entry while this one
                // was queued behind the flight group.
                if let Lookup::Fresh(value) = self.store.lookup(&key) {
                    return (value, Served::Cached);
                }

                self.limiter.acquire().await;

                let outcome =
                    tokio::time::timeout(self.config.upstream_timeout, upstream()).await;
                match outcome {
                    Ok(Ok(Some(value))) => {
                        self.store.insert(key, value.clone());
                        return (value, Served::Fresh);
                    }
                    Ok(Ok(None)) => {
                        warn!(
                            target: "ecodash::fetch",
                            provider = self.provider,
                            key,
                            "upstream returned an empty payload"
                        );
                    }
                    Ok(Err(error)) => {
                        warn!(
                            target: "ecodash::fetch",
                            provider = self.provider,
                            key,
                            %error,
                            "upstream call failed"
                        );
                    }
                    Err(_) => {
                        warn!(
                            target: "ecodash::fetch",
                            provider = self.provider,
                            key,
                            timeout_ms = self.config.upstream_timeout.as_millis() as u64,
                            "upstream call timed out"
                        );
                    }
                }
                counter!("ecodash_fetch_upstream_failure_total", "provider" => self.provider)
                    .increment(1);

                match self.store.lookup(&key) {
                    // A concurrent refresh can land while this call was
                    // failing; that entry is current, not last-known-good.
                    Lookup::Fresh(value) => (value, Served::Cached),
                    Lookup::Stale(value) => {
                        counter!("ecodash_fetch_stale_total", "provider" => self.provider)
                            .increment(1);
                        (value, Served::Stale)
                    }
                    Lookup::Miss => {
                        counter!("ecodash_fetch_sample_total", "provider" => self.provider)
                            .increment(1);
                        (sample(), Served::Sample)
                    }
                }
            })
            .await
    }

    /// Drop every cached entry, forcing the next reads upstream.
    pub fn invalidate(&self) {
        self.store.invalidate_all();
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    fn quick_config() -> FetchConfig {
        FetchConfig {
            ttl: Duration::from_secs(60),
            capacity: NonZeroUsize::new(8).expect("capacity"),
            min_interval: Duration::ZERO,
            upstream_timeout: Duration::from_millis(50),
        }
    }

    #[tokio::test]
    async fn first_read_is_fresh_second_is_cached() {
        let fetcher: Fetcher<u32> = Fetcher::new("test", quick_config());
        let calls = AtomicUsize::new(0);

        let (value, served) = fetcher
            .fetch(
                "k".to_string(),
                || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(Some(5))
                },
                || 0,
            )
            .await;
        assert_eq!((value, served), (5, Served::Fresh));

        let (value, served) = fetcher
            .fetch(
                "k".to_string(),
                || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(Some(6))
                },
                || 0,
            )
            .await;
        assert_eq!((value, served), (5, Served::Cached));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failure_with_nothing_cached_serves_sample() {
        let fetcher: Fetcher<u32> = Fetcher::new("test", quick_config());

        let (value, served) = fetcher
            .fetch(
                "k".to_string(),
                || async { Err(InfraError::upstream("test", "boom")) },
                || 9,
            )
            .await;
        assert_eq!((value, served), (9, Served::Sample));
    }

    #[tokio::test]
    async fn failure_after_expiry_serves_stale() {
        let config = FetchConfig {
            ttl: Duration::ZERO,
            ..quick_config()
        };
        let fetcher: Fetcher<u32> = Fetcher::new("test", config);

        // Seed the store; TTL of zero makes the entry immediately stale.
        let (_, served) = fetcher
            .fetch("k".to_string(), || async { Ok(Some(5)) }, || 0)
            .await;
        assert_eq!(served, Served::Fresh);

        let (value, served) = fetcher
            .fetch(
                "k".to_string(),
                || async { Err(InfraError::upstream("test", "down")) },
                || 0,
            )
            .await;
        assert_eq!((value, served), (5, Served::Stale));
    }

    #[tokio::test]
    async fn empty_payload_counts_as_failure() {
        let fetcher: Fetcher<u32> = Fetcher::new("test", quick_config());

        let (value, served) = fetcher
            .fetch("k".to_string(), || async { Ok(None) }, || 3)
            .await;
        assert_eq!((value, served), (3, Served::Sample));
    }

    #[tokio::test]
    async fn slow_upstream_times_out_into_sample() {
        let fetcher: Fetcher<u32> = Fetcher::new("test", quick_config());

        let (value, served) = fetcher
            .fetch(
                "k".to_string(),
                || async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok(Some(1))
                },
                || 2,
            )
            .await;
        assert_eq!((value, served), (2, Served::Sample));
    }

    #[tokio::test]
    async fn concurrent_misses_coalesce_into_one_upstream_call() {
        let fetcher: Arc<Fetcher<u32>> = Arc::new(Fetcher::new("test", quick_config()));
        let calls = Arc::new(AtomicUsize::new(0));

        let mut tasks = Vec::new();
        for _ in 0..4 {
            let fetcher = fetcher.clone();
            let calls = calls.clone();
            tasks.push(tokio::spawn(async move {
                fetcher
                    .fetch(
                        "k".to_string(),
                        || async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            tokio::task::yield_now().await;
                            Ok(Some(11))
                        },
                        || 0,
                    )
                    .await
            }));
        }

        for task in tasks {
            let (value, served) = task.await.expect("task");
            assert_eq!(value, 11);
            assert!(matches!(served, Served::Fresh | Served::Cached));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn leader_failure_hands_followers_the_fallback() {
        let fetcher: Arc<Fetcher<u32>> = Arc::new(Fetcher::new("test", quick_config()));
        let calls = Arc::new(AtomicUsize::new(0));

        let mut tasks = Vec::new();
        for _ in 0..3 {
            let fetcher = fetcher.clone();
            let calls = calls.clone();
            tasks.push(tokio::spawn(async move {
                fetcher
                    .fetch(
                        "k".to_string(),
                        || async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            tokio::task::yield_now().await;
                            Err(InfraError::upstream("test", "down"))
                        },
                        || 7,
                    )
                    .await
            }));
        }

        // One failed upstream call, shared by everyone who coalesced.
        for task in tasks {
            assert_eq!(task.await.expect("task"), (7, Served::Sample));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn refresh_landing_mid_failure_is_served_as_cached() {
        let fetcher: Arc<Fetcher<u32>> = Arc::new(Fetcher::new("test", quick_config()));

        let sibling = fetcher.clone();
        let (value, served) = fetcher
            .fetch(
                "k".to_string(),
                || async move {
                    // A concurrent caller refreshes the entry while this
                    // call is on its way to failing.
                    sibling.store.insert("k".to_string(), 8);
                    Err(InfraError::upstream("test", "down"))
                },
                || 0,
            )
            .await;
        assert_eq!((value, served), (8, Served::Cached));
    }

    #[tokio::test]
    async fn invalidate_forces_the_next_read_upstream() {
        let fetcher: Fetcher<u32> = Fetcher::new("test", quick_config());

        let (_, served) = fetcher
            .fetch("k".to_string(), || async { Ok(Some(1)) }, || 0)
            .await;
        assert_eq!(served, Served::Fresh);

        fetcher.invalidate();

        let (value, served) = fetcher
            .fetch("k".to_string(), || async { Ok(Some(2)) }, || 0)
            .await;
        assert_eq!((value, served), (2, Served::Fresh));
    }
}
