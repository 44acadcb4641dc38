//! A small time-to-live cache keyed by record id.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Entries older than the TTL are treated as misses and evicted when looked
/// up. Nothing runs in the background; call `purge_expired` to sweep.
#[derive(Debug, Clone)]
pub struct TtlCache<V> {
    ttl: Duration,
    entries: HashMap<String, (Instant, V)>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, entries: HashMap::new() }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn get(&mut self, key: &str) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    /// Look up `key` as of `now`, evicting it if it has expired.
    pub fn get_at(&mut self, key: &str, now: Instant) -> Option<V> {
        let (stored_at, value) = self.entries.get(key)?;
        if now.saturating_duration_since(*stored_at) >= self.ttl {
            self.entries.remove(key);
            return None;
        }
        Some(value.clone())
    }

    pub fn insert(&mut self, key: impl Into<String>, value: V) {
        self.insert_at(key, value, Instant::now());
    }

    pub fn insert_at(&mut self, key: impl Into<String>, value: V, now: Instant) {
        self.entries.insert(key.into(), (now, value));
    }

    pub fn invalidate(&mut self, key: &str) -> Option<V> {
        self.entries.remove(key).map(|(_, v)| v)
    }

    /// Drop every expired entry and return how many were removed.
    pub fn purge_expired(&mut self, now: Instant) -> usize {
        let before = self.entries.len();
        let ttl = self.ttl;
        self.entries.retain(|_, (stored_at, _)| now.saturating_duration_since(*stored_at) < ttl);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
