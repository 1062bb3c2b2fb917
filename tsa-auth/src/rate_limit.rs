//! Sliding-window rate limiter, per-key (typically per user id or per IP).
//!
//! Each key maps to a `VecDeque` of request timestamps; `check` prunes
//! entries older than the window before counting, so the boundary is
//! exact rather than bucketed.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use dashmap::DashMap;

pub struct RateLimiter {
    buckets: DashMap<String, VecDeque<Instant>>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self { buckets: DashMap::new(), max_requests, window }
    }

    pub fn default_policy() -> Self {
        Self::new(10, Duration::from_secs(300))
    }

    /// Returns `Ok(())` and records the request if under the limit, or
    /// `Err(retry_after)` with the duration until the oldest request in
    /// the window expires.
    pub fn check(&self, key: &str) -> Result<(), Duration> {
        let now = Instant::now();
        let mut bucket = self.buckets.entry(key.to_string()).or_default();

        while let Some(&oldest) = bucket.front() {
            if now.duration_since(oldest) >= self.window {
                bucket.pop_front();
            } else {
                break;
            }
        }

        if bucket.len() >= self.max_requests {
            let oldest = *bucket.front().expect("bucket full implies non-empty");
            let retry_after = self.window.saturating_sub(now.duration_since(oldest));
            return Err(retry_after);
        }

        bucket.push_back(now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_requests_under_the_limit() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));
        assert!(limiter.check("user-1").is_ok());
        assert!(limiter.check("user-1").is_ok());
        assert!(limiter.check("user-1").is_ok());
    }

    #[test]
    fn rejects_the_request_over_the_limit() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        assert!(limiter.check("user-1").is_ok());
        assert!(limiter.check("user-1").is_ok());
        assert!(limiter.check("user-1").is_err());
    }

    #[test]
    fn keys_are_independent() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        assert!(limiter.check("user-1").is_ok());
        assert!(limiter.check("user-2").is_ok());
        assert!(limiter.check("user-1").is_err());
    }

    #[test]
    fn default_policy_allows_ten_then_rejects() {
        let limiter = RateLimiter::default_policy();
        for _ in 0..10 {
            assert!(limiter.check("k").is_ok());
        }
        assert!(limiter.check("k").is_err());
    }
}
