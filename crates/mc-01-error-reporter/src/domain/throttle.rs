//! # Report Throttle
//!
//! Time-bounded map from `(module, message)` to the timestamp of the last
//! accepted report with that key. Entries older than the window are
//! garbage-collected so a long session with many distinct messages stays
//! bounded.
//!
//! Stack traces are deliberately not part of the key: two failures with the
//! same message from the same module are the same failure here.

use shared_types::Timestamp;
use std::collections::HashMap;

type ThrottleKey = (String, String);

#[derive(Debug)]
pub struct ReportThrottle {
    /// Key -> time of the last accepted report.
    last_accepted: HashMap<ThrottleKey, Timestamp>,
    window_ms: u64,
    last_gc: Timestamp,
}

impl ReportThrottle {
    #[must_use]
    pub fn new(window_ms: u64) -> Self {
        Self {
            last_accepted: HashMap::new(),
            window_ms,
            last_gc: 0,
        }
    }

    /// Whether a report for this key at `now` falls inside the window of the
    /// last accepted one.
    #[must_use]
    pub fn is_throttled(&self, module: &str, message: &str, now: Timestamp) -> bool {
        if self.window_ms == 0 {
            return false;
        }
        self.last_accepted
            .get(&(module.to_string(), message.to_string()))
            .is_some_and(|&last| now.saturating_sub(last) < self.window_ms)
    }

    /// Record an accepted report.
    pub fn record(&mut self, module: &str, message: &str, now: Timestamp) {
        if now.saturating_sub(self.last_gc) > self.window_ms {
            self.garbage_collect(now);
            self.last_gc = now;
        }
        self.last_accepted
            .insert((module.to_string(), message.to_string()), now);
    }

    fn garbage_collect(&mut self, now: Timestamp) {
        let window = self.window_ms;
        self.last_accepted
            .retain(|_, &mut last| now.saturating_sub(last) < window);
    }

    pub fn clear(&mut self) {
        self.last_accepted.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.last_accepted.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.last_accepted.is_empty()
    }
}
