//! Time-bounded cache for rarely-changing remote identifiers

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: HashMap<K, (Instant, V)>,
}

impl<K: Eq + Hash, V: Clone> TtlCache<K, V> {
    pub fn new(ttl: Duration) -> Self {
        TtlCache {
            ttl,
            entries: HashMap::new(),
        }
    }

    /// Returns the value if it is younger than the TTL; drops it otherwise
    pub fn get(&mut self, key: &K) -> Option<V> {
        let fresh = match self.entries.get(key) {
            Some((stored_at, _)) => stored_at.elapsed() < self.ttl,
            None => return None,
        };

        if fresh {
            self.entries.get(key).map(|(_, value)| value.clone())
        } else {
            self.entries.remove(key);
            None
        }
    }

    pub fn insert(&mut self, key: K, value: V) {
        self.entries.insert(key, (Instant::now(), value));
    }

    pub fn invalidate(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
