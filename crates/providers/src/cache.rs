//! Response cache owned by the content-API client.
//!
//! Entries are keyed by the full resolved URL so distinct paths and
//! queries never collide. The clock is injected so expiry is testable
//! without real delays.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Maximum age at which a cached response may still be served.
pub const RESPONSE_TTL: Duration = Duration::from_secs(90);

pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

struct Entry {
    value: serde_json::Value,
    fetched_at: Instant,
}

pub struct ResponseCache {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<String, Entry>>,
}

impl ResponseCache {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the cached payload for `key` if it is younger than the TTL.
    /// Expired entries are dropped on lookup.
    pub fn get(&self, key: &str) -> Option<serde_json::Value> {
        let now = self.clock.now();
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        match entries.get(key) {
            Some(entry) if now.duration_since(entry.fetched_at) < self.ttl => {
                Some(entry.value.clone())
            }
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn put(&self, key: &str, value: serde_json::Value) {
        let entry = Entry {
            value,
            fetched_at: self.clock.now(),
        };
        self.entries
            .lock()
            .expect("cache lock poisoned")
            .insert(key.to_string(), entry);
    }

    pub fn clear(&self) {
        self.entries.lock().expect("cache lock poisoned").clear();
    }
}
