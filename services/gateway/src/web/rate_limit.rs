//! services/gateway/src/web/rate_limit.rs
//!
//! A fixed-window request counter. All callers share one window; each
//! caller key gets its own count within it. When the window expires the
//! whole table resets at once.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

pub struct FixedWindowLimiter {
    max_requests: u32,
    window: Duration,
    state: Mutex<WindowState>,
}

struct WindowState {
    window_start: Instant,
    counts: HashMap<String, u32>,
}

impl FixedWindowLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            state: Mutex::new(WindowState {
                window_start: Instant::now(),
                counts: HashMap::new(),
            }),
        }
    }

    /// Records one request for `key` and reports whether it fits the
    /// current window's budget.
    pub fn check(&self, key: &str) -> bool {
        self.check_at(key, Instant::now())
    }

    /// Clock-injected form of [`check`](Self::check), used by tests.
    pub fn check_at(&self, key: &str, now: Instant) -> bool {
        // A poisoned lock only means another caller panicked mid-check;
        // the table itself is still usable.
        let mut state = match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };

        if now.duration_since(state.window_start) >= self.window {
            state.window_start = now;
            state.counts.clear();
        }

        let count = state.counts.entry(key.to_string()).or_insert(0);
        if *count >= self.max_requests {
            return false;
        }
        *count += 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_budget_is_enforced_within_a_window() {
        let limiter = FixedWindowLimiter::new(40, Duration::from_secs(60));
        let now = Instant::now();
        for _ in 0..40 {
            assert!(limiter.check_at("http://localhost:5173", now));
        }
        assert!(!limiter.check_at("http://localhost:5173", now));
        assert!(!limiter.check_at("http://localhost:5173", now));
    }

    #[test]
    fn the_window_resets_the_count() {
        let limiter = FixedWindowLimiter::new(2, Duration::from_secs(60));
        let start = Instant::now();
        assert!(limiter.check_at("a", start));
        assert!(limiter.check_at("a", start));
        assert!(!limiter.check_at("a", start));

        let later = start + Duration::from_secs(61);
        assert!(limiter.check_at("a", later));
    }

    #[test]
    fn callers_do_not_share_a_budget() {
        let limiter = FixedWindowLimiter::new(1, Duration::from_secs(60));
        let now = Instant::now();
        assert!(limiter.check_at("a", now));
        assert!(!limiter.check_at("a", now));
        assert!(limiter.check_at("b", now));
        assert!(limiter.check_at("unknown", now));
    }
}
