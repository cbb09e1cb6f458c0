use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::debug;

/// Optional fast lookup for persona configs and session state (spec.md
/// §1). Interface only — callers must tolerate cache misses by falling
/// back to the store.
pub trait CachePort: Send + Sync {
    fn get(&self, key: &str) -> Option<Vec<u8>>;
    fn put(&self, key: &str, value: Vec<u8>, ttl: Duration);
    fn invalidate(&self, key: &str);
}

struct Entry {
    value: Vec<u8>,
    expires_at: Instant,
}

/// Bounded in-memory cache: a `HashMap` plus a parallel insertion-order
/// `Vec`, evicting the oldest half of entries when at capacity. Mirrors
/// the resolver-cache shape used elsewhere in this codebase's identity
/// lookups.
pub struct BoundedCache {
    entries: Mutex<HashMap<String, Entry>>,
    order: Mutex<Vec<String>>,
    max_entries: usize,
}

impl BoundedCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            order: Mutex::new(Vec::new()),
            max_entries,
        }
    }

    fn evict_oldest_half(&self) {
        let mut order = self.order.lock().unwrap();
        let mut entries = self.entries.lock().unwrap();
        let to_evict = order.len() / 2;
        for key in order.drain(..to_evict) {
            entries.remove(&key);
        }
        debug!(evicted = to_evict, "cache evicted oldest half at capacity");
    }
}

impl Default for BoundedCache {
    fn default() -> Self {
        Self::new(256)
    }
}

impl CachePort for BoundedCache {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        let mut entries = self.entries.lock().unwrap();
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    fn put(&self, key: &str, value: Vec<u8>, ttl: Duration) {
        {
            let mut order = self.order.lock().unwrap();
            if !order.contains(&key.to_string()) {
                order.push(key.to_string());
            }
            if order.len() > self.max_entries {
                drop(order);
                self.evict_oldest_half();
            }
        }
        let mut entries = self.entries.lock().unwrap();
        entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    fn invalidate(&self, key: &str) {
        self.entries.lock().unwrap().remove(key);
        self.order.lock().unwrap().retain(|k| k != key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_then_get_round_trips() {
        let cache = BoundedCache::new(8);
        cache.put("a", b"hello".to_vec(), Duration::from_secs(60));
        assert_eq!(cache.get("a"), Some(b"hello".to_vec()));
    }

    #[test]
    fn expired_entries_return_none() {
        let cache = BoundedCache::new(8);
        cache.put("a", b"hello".to_vec(), Duration::from_millis(0));
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(cache.get("a"), None);
    }

    #[test]
    fn evicts_oldest_half_at_capacity() {
        let cache = BoundedCache::new(4);
        for i in 0..5 {
            cache.put(&format!("k{i}"), vec![i as u8], Duration::from_secs(60));
        }
        assert!(cache.get("k0").is_none());
        assert!(cache.get("k4").is_some());
    }

    #[test]
    fn invalidate_removes_entry() {
        let cache = BoundedCache::new(8);
        cache.put("a", b"x".to_vec(), Duration::from_secs(60));
        cache.invalidate("a");
        assert_eq!(cache.get("a"), None);
    }
}
