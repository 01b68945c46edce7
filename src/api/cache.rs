use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Key → value store whose entries expire after a fixed TTL
#[derive(Debug)]
pub struct TtlCache<V> {
    ttl: Duration,
    entries: HashMap<String, (Instant, V)>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    pub fn get(&mut self, key: &str) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    /// Same as [`get`](Self::get) with an explicit clock; expired entries are evicted.
    pub fn get_at(&mut self, key: &str, now: Instant) -> Option<V> {
        let expired = match self.entries.get(key) {
            Some((stored, _)) => now.saturating_duration_since(*stored) >= self.ttl,
            None => return None,
        };
        if expired {
            self.entries.remove(key);
            return None;
        }
        self.entries.get(key).map(|(_, v)| v.clone())
    }

    pub fn insert(&mut self, key: impl Into<String>, value: V) {
        self.insert_at(key, value, Instant::now());
    }

    pub fn insert_at(&mut self, key: impl Into<String>, value: V, now: Instant) {
        self.entries.insert(key.into(), (now, value));
    }

    pub fn invalidate(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Drop every key starting with `prefix`; returns how many were dropped
    pub fn invalidate_prefix(&mut self, prefix: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|k, _| !k.starts_with(prefix));
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
