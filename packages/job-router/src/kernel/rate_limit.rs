//! Fixed-window rate limiter (C6), keyed by (operation, principal).
//!
//! A single-process in-memory map is sufficient per §4.4; a shared deployment
//! would swap the backing map for an external store behind the same interface
//! and fail open on a store error (never block a request because the limiter
//! itself is unavailable).

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

struct Window {
    count: u32,
    window_start: DateTime<Utc>,
}

pub struct RateLimiter {
    windows: Mutex<HashMap<String, Window>>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Returns `false` iff the key is already at or above `max` requests within
    /// the current window. Does not itself consume a slot — see [`Self::increment`].
    pub fn check_rate_limit(&self, key: &str, max: u32, window: Duration) -> bool {
        let mut windows = self.windows.lock().unwrap();
        let now = Utc::now();
        let entry = windows.entry(key.to_string()).or_insert(Window {
            count: 0,
            window_start: now,
        });

        if now - entry.window_start >= window {
            entry.count = 0;
            entry.window_start = now;
        }

        entry.count < max
    }

    /// Atomically bumps the counter for `key`, rolling the window if it has expired.
    pub fn increment(&self, key: &str, window: Duration) {
        let mut windows = self.windows.lock().unwrap();
        let now = Utc::now();
        let entry = windows.entry(key.to_string()).or_insert(Window {
            count: 0,
            window_start: now,
        });

        if now - entry.window_start >= window {
            entry.count = 0;
            entry.window_start = now;
        }
        entry.count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_max_requests_per_window() {
        let limiter = RateLimiter::new();
        let window = Duration::seconds(60);
        for _ in 0..3 {
            assert!(limiter.check_rate_limit("op:company", 3, window));
            limiter.increment("op:company", window);
        }
        assert!(!limiter.check_rate_limit("op:company", 3, window));
    }

    #[test]
    fn keys_are_independent() {
        let limiter = RateLimiter::new();
        let window = Duration::seconds(60);
        limiter.increment("a", window);
        limiter.increment("a", window);
        assert!(limiter.check_rate_limit("b", 1, window));
    }

    #[test]
    fn window_resets_after_expiry() {
        let limiter = RateLimiter::new();
        let window = Duration::milliseconds(10);
        limiter.increment("op", window);
        std::thread::sleep(std::time::Duration::from_millis(20));
        assert!(limiter.check_rate_limit("op", 1, window));
    }
}
