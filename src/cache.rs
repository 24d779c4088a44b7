//! Tiered response caching keyed by hash prefix
//!
//! Two positive tiers hold raw range-response payloads: a regular tier
//! with a short TTL and a persistent tier with a long one. A lookup walks
//! regular → persistent, promoting a persistent hit back into the regular
//! tier. A separate negative tier remembers prefixes whose lookups failed
//! with a non-transient error, so known-bad prefixes short-circuit before
//! any network attempt.
//!
//! Keys are always the 5-character hash prefix, never the suffix or the
//! password, so no cache entry can be reversed into a password.

use crate::config::CacheConfig;
use crate::error::ErrorKind;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

struct CacheEntry {
    payload: String,
    inserted_at: Instant,
}

struct NegativeEntry {
    kind: ErrorKind,
    inserted_at: Instant,
}

struct CacheInner {
    regular: HashMap<String, CacheEntry>,
    persistent: HashMap<String, CacheEntry>,
    negative: HashMap<String, NegativeEntry>,
}

/// Regular/persistent/negative cache tiers behind one lock
pub struct CacheLayer {
    regular_ttl: Duration,
    persistent_ttl: Duration,
    negative_ttl: Duration,
    regular_capacity: usize,
    persistent_capacity: usize,
    inner: Mutex<CacheInner>,
}

impl CacheLayer {
    /// Create empty tiers from configuration
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            regular_ttl: config.regular_ttl(),
            persistent_ttl: config.persistent_ttl(),
            negative_ttl: config.negative_ttl(),
            regular_capacity: config.regular_capacity.max(1),
            persistent_capacity: config.persistent_capacity.max(1),
            inner: Mutex::new(CacheInner {
                regular: HashMap::new(),
                persistent: HashMap::new(),
                negative: HashMap::new(),
            }),
        }
    }

    /// Look up a cached range payload, walking regular → persistent.
    ///
    /// A persistent hit is promoted back into the regular tier with a
    /// fresh timestamp. Expired entries are dropped on the way through.
    pub fn get(&self, prefix: &str) -> Option<String> {
        let mut inner = self.inner.lock().expect("cache lock poisoned");

        if let Some(entry) = inner.regular.get(prefix) {
            if entry.inserted_at.elapsed() <= self.regular_ttl {
                return Some(entry.payload.clone());
            }
            inner.regular.remove(prefix);
        }

        let payload = match inner.persistent.get(prefix) {
            Some(entry) if entry.inserted_at.elapsed() <= self.persistent_ttl => {
                entry.payload.clone()
            }
            Some(_) => {
                inner.persistent.remove(prefix);
                return None;
            }
            None => return None,
        };

        debug!(prefix, "promoting persistent cache hit");
        Self::insert_bounded(
            &mut inner.regular,
            self.regular_capacity,
            1,
            prefix,
            &payload,
        );
        Some(payload)
    }

    /// Store a range payload in both positive tiers
    pub fn put(&self, prefix: &str, payload: &str) {
        let mut inner = self.inner.lock().expect("cache lock poisoned");
        Self::insert_bounded(
            &mut inner.regular,
            self.regular_capacity,
            1,
            prefix,
            payload,
        );
        let persistent_batch = (self.persistent_capacity / 10).max(1);
        Self::insert_bounded(
            &mut inner.persistent,
            self.persistent_capacity,
            persistent_batch,
            prefix,
            payload,
        );
        // Fresh data supersedes any remembered failure for this prefix.
        inner.negative.remove(prefix);
    }

    /// Look up a remembered failure for a prefix
    pub fn negative_get(&self, prefix: &str) -> Option<ErrorKind> {
        let mut inner = self.inner.lock().expect("cache lock poisoned");
        match inner.negative.get(prefix) {
            Some(entry) if entry.inserted_at.elapsed() <= self.negative_ttl => Some(entry.kind),
            Some(_) => {
                inner.negative.remove(prefix);
                None
            }
            None => None,
        }
    }

    /// Remember a non-transient failure for a prefix.
    ///
    /// The caller is responsible for filtering out transient kinds via
    /// `CheckError::is_negative_cacheable`.
    pub fn negative_put(&self, prefix: &str, kind: ErrorKind) {
        let mut inner = self.inner.lock().expect("cache lock poisoned");
        debug!(prefix, kind = kind.as_str(), "negative caching prefix");
        inner.negative.insert(
            prefix.to_string(),
            NegativeEntry {
                kind,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Drop positive entries; the persistent tier only when requested
    pub fn clear(&self, include_persistent: bool) {
        let mut inner = self.inner.lock().expect("cache lock poisoned");
        inner.regular.clear();
        if include_persistent {
            inner.persistent.clear();
        }
    }

    /// Drop all remembered failures
    pub fn clear_negative(&self) {
        let mut inner = self.inner.lock().expect("cache lock poisoned");
        inner.negative.clear();
    }

    /// Entry counts per tier: (regular, persistent, negative)
    pub fn sizes(&self) -> (usize, usize, usize) {
        let inner = self.inner.lock().expect("cache lock poisoned");
        (
            inner.regular.len(),
            inner.persistent.len(),
            inner.negative.len(),
        )
    }

    /// Insert with timestamp, evicting the oldest `evict_batch` entries
    /// if the tier would exceed `capacity`.
    fn insert_bounded(
        tier: &mut HashMap<String, CacheEntry>,
        capacity: usize,
        evict_batch: usize,
        prefix: &str,
        payload: &str,
    ) {
        if !tier.contains_key(prefix) && tier.len() >= capacity {
            let mut by_age: Vec<(String, Instant)> = tier
                .iter()
                .map(|(k, e)| (k.clone(), e.inserted_at))
                .collect();
            by_age.sort_by_key(|(_, inserted_at)| *inserted_at);

            let overflow = tier.len() + 1 - capacity;
            for (key, _) in by_age.into_iter().take(evict_batch.max(overflow)) {
                tier.remove(&key);
            }
        }

        tier.insert(
            prefix.to_string(),
            CacheEntry {
                payload: payload.to_string(),
                inserted_at: Instant::now(),
            },
        );
    }
}
