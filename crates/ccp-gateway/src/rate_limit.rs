//! Per-identity sliding-window rate limiting
//!
//! Each identity owns a queue of request timestamps covering the trailing
//! window. The outer map is only write-locked when a new identity shows up;
//! the purge-check-append sequence runs under that identity's own mutex, so
//! unrelated callers never wait on each other.
//!
//! Windows are created lazily and never evicted: the map grows with the
//! number of distinct credentials seen during the process lifetime.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::{Duration, Instant};

use tracing::debug;

/// Width of the sliding window.
pub const WINDOW: Duration = Duration::from_secs(60);

type Window = Arc<Mutex<VecDeque<Instant>>>;

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted,
    /// `retry_after` is how long until the oldest recorded request leaves
    /// the window; `None` when the capacity is zero.
    Throttled { retry_after: Option<Duration> },
}

#[derive(Debug)]
pub struct SlidingWindowLimiter {
    capacity: usize,
    window: Duration,
    windows: RwLock<HashMap<String, Window>>,
}

impl SlidingWindowLimiter {
    pub fn new(capacity: usize) -> Self {
        Self::with_window(capacity, WINDOW)
    }

    pub fn with_window(capacity: usize, window: Duration) -> Self {
        Self {
            capacity,
            window,
            windows: RwLock::new(HashMap::new()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Check and record a request for `key` at the current instant.
    pub fn admit(&self, key: &str) -> Admission {
        self.admit_at(key, Instant::now())
    }

    /// Check and record a request for `key` at `now`.
    pub fn admit_at(&self, key: &str, now: Instant) -> Admission {
        let window = self.window_for(key);
        let mut timestamps = window.lock().unwrap_or_else(PoisonError::into_inner);

        while let Some(oldest) = timestamps.front() {
            if now.saturating_duration_since(*oldest) > self.window {
                timestamps.pop_front();
            } else {
                break;
            }
        }

        if timestamps.len() >= self.capacity {
            let retry_after = timestamps
                .front()
                .map(|oldest| self.window.saturating_sub(now.saturating_duration_since(*oldest)));
            return Admission::Throttled { retry_after };
        }

        timestamps.push_back(now);
        Admission::Admitted
    }

    /// Number of identities with a window, including idle ones.
    pub fn tracked_identities(&self) -> usize {
        self.windows
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn window_for(&self, key: &str) -> Window {
        if let Some(window) = self
            .windows
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
        {
            return Arc::clone(window);
        }

        let mut windows = self.windows.write().unwrap_or_else(PoisonError::into_inner);
        let window = Arc::clone(windows.entry(key.to_string()).or_default());
        debug!(tracked = windows.len(), "created rate-limit window");
        window
    }
}
