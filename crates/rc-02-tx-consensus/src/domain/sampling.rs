//! Per-validator sampling cache.
//!
//! Remembers when each `(subject, prefix)` announcement was last committed
//! so the node can skip re-submitting the same non-attack observation
//! inside the sampling window. Local rate limit only; consensus does not
//! depend on it.

use parking_lot::Mutex;
use shared_types::AsNumber;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy)]
struct Entry {
    /// Observation timestamp, unix seconds.
    observed_at: u64,
    recorded_at: Instant,
}

#[derive(Debug, Default)]
pub struct SamplingCache {
    entries: Mutex<HashMap<(AsNumber, String), Entry>>,
}

impl SamplingCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep the newest observation timestamp per key.
    pub fn record(&self, subject: AsNumber, prefix_key: &str, observed_at: u64) {
        let mut entries = self.entries.lock();
        let entry = entries
            .entry((subject, prefix_key.to_string()))
            .or_insert(Entry {
                observed_at,
                recorded_at: Instant::now(),
            });
        entry.observed_at = entry.observed_at.max(observed_at);
        entry.recorded_at = Instant::now();
    }

    pub fn last_seen(&self, subject: AsNumber, prefix_key: &str) -> Option<u64> {
        self.entries
            .lock()
            .get(&(subject, prefix_key.to_string()))
            .map(|e| e.observed_at)
    }

    /// True when nothing for this key was committed within `window` of
    /// `observed_at`.
    pub fn should_submit(
        &self,
        subject: AsNumber,
        prefix_key: &str,
        observed_at: u64,
        window: Duration,
    ) -> bool {
        match self.last_seen(subject, prefix_key) {
            None => true,
            Some(last) => observed_at.saturating_sub(last) >= window.as_secs(),
        }
    }

    /// Drop entries recorded more than `max_age` ago. Returns how many went.
    pub fn expire(&self, now: Instant, max_age: Duration) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, e| now.saturating_duration_since(e.recorded_at) < max_age);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
