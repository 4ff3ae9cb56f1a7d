use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Sliding-window request limiter, bucketed per client key and route.
#[derive(Debug, Clone)]
pub struct ApiRateLimiter {
    window: Duration,
    max_requests: u32,
    buckets: Arc<DashMap<String, Vec<Instant>>>,
}

impl ApiRateLimiter {
    pub fn new(window: Duration, max_requests: u32) -> Self {
        Self {
            window,
            max_requests,
            buckets: Arc::new(DashMap::new()),
        }
    }

    pub fn allow(&self, key: &str, route: &str) -> bool {
        let bucket_key = format!("{key}:{route}");
        let now = Instant::now();
        let window = self.window;

        let mut entry = self.buckets.entry(bucket_key).or_default();
        entry.retain(|instant| now.duration_since(*instant) < window);

        if entry.len() as u32 >= self.max_requests {
            return false;
        }

        entry.push(now);
        true
    }

    pub fn retry_after_secs(&self) -> u64 {
        self.window.as_secs().max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requests_beyond_the_window_budget_are_refused() {
        let limiter = ApiRateLimiter::new(Duration::from_secs(60), 2);

        assert!(limiter.allow("client", "/api/sales"));
        assert!(limiter.allow("client", "/api/sales"));
        assert!(!limiter.allow("client", "/api/sales"));

        // Other routes and clients have their own buckets.
        assert!(limiter.allow("client", "/api/stats"));
        assert!(limiter.allow("other", "/api/sales"));
    }

    #[test]
    fn window_expiry_frees_the_budget() {
        let limiter = ApiRateLimiter::new(Duration::from_millis(10), 1);
        assert!(limiter.allow("client", "/"));
        assert!(!limiter.allow("client", "/"));

        std::thread::sleep(Duration::from_millis(20));
        assert!(limiter.allow("client", "/"));
    }
}
