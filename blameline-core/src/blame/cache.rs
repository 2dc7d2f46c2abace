//! Time-bounded store of parsed annotations
//!
//! Entries expire `ttl` after insertion. Expiry is checked on every read
//! against an injected [`Clock`]; there is no background eviction.

use crate::types::{AnnotationMap, CacheKey};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Default lifetime of a cache entry.
pub const DEFAULT_TTL: Duration = Duration::from_millis(60_000);

/// Source of wall-clock time in epoch milliseconds.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

/// Real wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(start_millis: i64) -> Self {
        Self {
            now: AtomicI64::new(start_millis),
        }
    }

    pub fn set(&self, millis: i64) {
        self.now.store(millis, Ordering::SeqCst);
    }

    pub fn advance(&self, by: Duration) {
        self.now.fetch_add(by.as_millis() as i64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

struct CacheEntry {
    map: Arc<AnnotationMap>,
    inserted_at: i64,
}

/// Annotation maps keyed by [`CacheKey`], each valid for a fixed TTL.
pub struct AnnotationCache {
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
    clock: Arc<dyn Clock>,
    ttl_millis: i64,
}

impl AnnotationCache {
    pub fn new(clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
            ttl_millis: ttl.as_millis() as i64,
        }
    }

    /// Cache on the system clock with [`DEFAULT_TTL`].
    pub fn with_defaults() -> Self {
        Self::new(Arc::new(SystemClock), DEFAULT_TTL)
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<CacheKey, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the map for `key` if it was inserted less than one TTL ago.
    pub fn get(&self, key: &CacheKey) -> Option<Arc<AnnotationMap>> {
        let now = self.clock.now_millis();
        let mut entries = self.entries();

        match entries.get(key) {
            Some(entry) if now.saturating_sub(entry.inserted_at) < self.ttl_millis => Some(entry.map.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn put(&self, key: CacheKey, map: Arc<AnnotationMap>) {
        let inserted_at = self.clock.now_millis();
        self.entries().insert(key, CacheEntry { map, inserted_at });
    }

    pub fn invalidate(&self, key: &CacheKey) {
        self.entries().remove(key);
    }

    pub fn invalidate_all(&self) {
        self.entries().clear();
    }

    /// Number of stored entries, expired ones included until they are read.
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
