//! Single-flight coalescing: concurrent identical requests share one
//! upstream call instead of each issuing their own.

use std::collections::HashMap;
use std::sync::Mutex;

use metrics::counter;
use tokio::sync::broadcast;
use tracing::warn;

use super::sync::lock_guard;

pub struct FlightGroup<T> {
    provider: &'static str,
    inflight: Mutex<HashMap<String, broadcast::Sender<T>>>,
}

/// Leadership over one in-flight key. Dropping the slot without releasing
/// it (the leader future was cancelled mid-call) removes the map entry and
/// with it the broadcast sender, so waiting followers see a closed channel
/// instead of hanging on a call that will never finish.
struct FlightSlot<'a, T> {
    inflight: &'a Mutex<HashMap<String, broadcast::Sender<T>>>,
    key: &'a str,
}

impl<T> FlightSlot<'_, T> {
    fn release(&self) -> Option<broadcast::Sender<T>> {
        lock_guard(self.inflight, "flights.release").remove(self.key)
    }
}

impl<T> Drop for FlightSlot<'_, T> {
    fn drop(&mut self) {
        let _ = self.release();
    }
}

impl<T: Clone> FlightGroup<T> {
    pub fn new(provider: &'static str) -> Self {
        Self {
            provider,
            inflight: Mutex::new(HashMap::new()),
        }
    }

    /// Run `work` for `key`, or wait for the identical call already in flight.
    ///
    /// The first caller for a key becomes the leader, runs `work`, and
    /// broadcasts the result; followers subscribe and never start their own
    /// upstream call. If the leader is cancelled before it can broadcast,
    /// its slot is released on drop and each follower falls back to running
    /// `work` itself.
    pub async fn run<F, Fut>(&self, key: &str, work: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let subscription = {
            let mut inflight = lock_guard(&self.inflight, "flights.register");
            match inflight.get(key) {
                Some(sender) => Some(sender.subscribe()),
                None => {
                    let (sender, _) = broadcast::channel(1);
                    inflight.insert(key.to_string(), sender);
                    None
                }
            }
        };

        if let Some(mut receiver) = subscription {
            counter!("ecodash_fetch_coalesced_total", "provider" => self.provider).increment(1);
            match receiver.recv().await {
                Ok(value) => return value,
                Err(_) => {
                    warn!(
                        target: "ecodash::fetch",
                        provider = self.provider,
                        key,
                        "in-flight leader vanished; retrying directly"
                    );
                    return work().await;
                }
            }
        }

        let slot = FlightSlot {
            inflight: &self.inflight,
            key,
        };
        let value = work().await;

        if let Some(sender) = slot.release() {
            // No receivers is fine: nobody coalesced onto this call.
            let _ = sender.send(value.clone());
        }

        value
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[tokio::test]
    async fn lone_caller_runs_work_once() {
        let group = FlightGroup::new("test");
        let value = group.run("k", || async { 42u32 }).await;
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_call() {
        let group = Arc::new(FlightGroup::new("test"));
        let calls = Arc::new(AtomicUsize::new(0));
        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();

        let leader = {
            let group = group.clone();
            let calls = calls.clone();
            tokio::spawn(async move {
                group
                    .run("k", || async {
                        calls.fetch_add(1, Ordering::SeqCst);
                        release_rx.await.ok();
                        7u32
                    })
                    .await
            })
        };

        // Let the leader register before the follower arrives.
        tokio::task::yield_now().await;

        let follower = {
            let group = group.clone();
            let calls = calls.clone();
            tokio::spawn(async move {
                group
                    .run("k", || async {
                        calls.fetch_add(1, Ordering::SeqCst);
                        99u32
                    })
                    .await
            })
        };

        tokio::task::yield_now().await;
        release_tx.send(()).expect("release leader");

        assert_eq!(leader.await.expect("leader"), 7);
        assert_eq!(follower.await.expect("follower"), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn distinct_keys_do_not_coalesce() {
        let group = Arc::new(FlightGroup::new("test"));
        let a = group.run("a", || async { 1u32 }).await;
        let b = group.run("b", || async { 2u32 }).await;
        assert_eq!((a, b), (1, 2));
    }

    #[tokio::test]
    async fn cancelled_leader_frees_the_key_for_followers() {
        let group = Arc::new(FlightGroup::new("test"));

        let leader = {
            let group = group.clone();
            tokio::spawn(async move {
                group
                    .run("k", || async { std::future::pending::<u32>().await })
                    .await
            })
        };
        tokio::task::yield_now().await;

        let follower = {
            let group = group.clone();
            tokio::spawn(async move { group.run("k", || async { 5u32 }).await })
        };
        tokio::task::yield_now().await;

        leader.abort();
        assert!(leader.await.is_err());

        // The waiting follower falls back to its own call instead of
        // hanging on the dead leader.
        assert_eq!(follower.await.expect("follower"), 5);

        // And a later caller for the same key starts clean.
        assert_eq!(group.run("k", || async { 6u32 }).await, 6);
    }
}
