use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::config::settings::RateWindow;
use crate::services::clock::Clock;

/// Fixed-window rate limiter keyed by action-qualified strings
/// (e.g. `magic.register:203.0.113.9`, `user.password.change:user-id`)
///
/// Windows are fixed, not sliding: the first hit opens the window and
/// every hit inside it counts against the limit until the window
/// expires, at which point the next hit opens a fresh one.
pub struct RateLimiter {
    clock: Arc<dyn Clock>,
    windows: Mutex<HashMap<String, WindowState>>,
}

#[derive(Debug, Clone, Copy)]
struct WindowState {
    started_at: i64,
    attempts: u32,
}

impl RateLimiter {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Record an attempt against `key`
    ///
    /// Returns `Ok(())` if the attempt is allowed, or `Err(retry_after)`
    /// with the seconds remaining in the window if the limit is hit.
    /// The rejected attempt does not extend the window.
    pub fn hit(&self, key: &str, window: RateWindow) -> Result<(), i64> {
        let now = self.clock.now_timestamp();
        let mut windows = self.windows.lock().expect("rate limiter lock poisoned");

        let state = windows
            .entry(key.to_string())
            .or_insert(WindowState {
                started_at: now,
                attempts: 0,
            });

        if now - state.started_at >= window.decay_seconds {
            state.started_at = now;
            state.attempts = 0;
        }

        if state.attempts >= window.max_attempts {
            return Err(state.started_at + window.decay_seconds - now);
        }

        state.attempts += 1;
        Ok(())
    }

    /// Whether `key` has exhausted its window, without recording a hit
    pub fn too_many_attempts(&self, key: &str, window: RateWindow) -> bool {
        self.available_in(key, window).is_some()
    }

    /// Seconds until `key` may retry, or None if attempts remain
    pub fn available_in(&self, key: &str, window: RateWindow) -> Option<i64> {
        let now = self.clock.now_timestamp();
        let windows = self.windows.lock().expect("rate limiter lock poisoned");

        let state = windows.get(key)?;
        if now - state.started_at >= window.decay_seconds {
            return None;
        }
        if state.attempts < window.max_attempts {
            return None;
        }

        Some(state.started_at + window.decay_seconds - now)
    }

    /// Forget all attempts for `key` (successful login clears its limiter)
    pub fn clear(&self, key: &str) {
        self.windows
            .lock()
            .expect("rate limiter lock poisoned")
            .remove(key);
    }

    /// Drop expired windows so abandoned keys do not accumulate
    pub fn purge_expired(&self, longest_decay_seconds: i64) {
        let now = self.clock.now_timestamp();
        self.windows
            .lock()
            .expect("rate limiter lock poisoned")
            .retain(|_, state| now - state.started_at < longest_decay_seconds);
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let windows = self.windows.lock().expect("rate limiter lock poisoned");
        f.debug_struct("RateLimiter")
            .field("tracked_keys", &windows.len())
            .finish()
    }
}
