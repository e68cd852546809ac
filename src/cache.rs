//! Usage: Generic in-memory TTL cache behind the three broker caches
//! (request-state, fetch-token, access-token).
//!
//! Callers pass the current unix time so expiry is deterministic under test.
//! Expired entries are dropped when touched; a full prune runs once the map
//! grows past a threshold, so eviction order is unspecified.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::shared::locking::recover_lock;

pub const DEFAULT_TTL_SECS: i64 = 15 * 60;

const FULL_PRUNE_THRESHOLD: usize = 1024;

#[derive(Debug, Clone)]
struct TtlEntry<T> {
    value: T,
    expires_at_unix: i64,
}

#[derive(Debug, Default)]
pub struct TtlCache<T> {
    inner: Mutex<HashMap<String, TtlEntry<T>>>,
}

impl<T: Clone> TtlCache<T> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the value unless the key is unknown or its TTL has elapsed.
    pub fn get(&self, key: &str, now_unix: i64) -> Option<T> {
        let mut inner = recover_lock(&self.inner);
        if let Some(entry) = inner.get(key) {
            if entry.expires_at_unix > now_unix {
                return Some(entry.value.clone());
            }
        } else {
            return None;
        }
        inner.remove(key);
        None
    }

    pub fn contains(&self, key: &str, now_unix: i64) -> bool {
        self.get(key, now_unix).is_some()
    }

    /// Overwrites any previous entry under `key`.
    pub fn set(&self, key: &str, value: T, ttl_secs: i64, now_unix: i64) {
        let mut inner = recover_lock(&self.inner);
        if inner.len() >= FULL_PRUNE_THRESHOLD {
            inner.retain(|_, entry| entry.expires_at_unix > now_unix);
        }
        inner.insert(
            key.to_string(),
            TtlEntry {
                value,
                expires_at_unix: now_unix.saturating_add(ttl_secs.max(1)),
            },
        );
    }

    pub fn set_default_ttl(&self, key: &str, value: T, now_unix: i64) {
        self.set(key, value, DEFAULT_TTL_SECS, now_unix);
    }
}
