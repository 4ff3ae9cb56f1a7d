//! Minimum-interval gate in front of an upstream provider.
//!
//! Departures are reserved under a lock and slept outside it, so waiting
//! callers line up at `min_interval` spacing without holding each other up.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

pub struct MinIntervalLimiter {
    min_interval: Duration,
    next_departure: Mutex<Option<Instant>>,
}

impl MinIntervalLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            next_departure: Mutex::new(None),
        }
    }

    /// Wait until this caller's reserved departure slot arrives.
    pub async fn acquire(&self) {
        if self.min_interval.is_zero() {
            return;
        }

        let slot = {
            let mut next = self.next_departure.lock().await;
            let now = Instant::now();
            let slot = match *next {
                Some(at) if at > now => at,
                _ => now,
            };
            *next = Some(slot + self.min_interval);
            slot
        };

        tokio::time::sleep_until(slot).await;
    }
}
