//! A small clock-driven TTL cache.
//!
//! Entries expire `ttl` after insertion. At capacity the oldest insertion
//! is evicted. The insertion queue keeps timestamps so that keys already
//! replaced or expired are recognised and skipped during eviction.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use radiant_core::clock::Clock;

struct Entry<V> {
    value: V,
    inserted_at: DateTime<Utc>,
}

struct Inner<K, V> {
    entries: HashMap<K, Entry<V>>,
    order: VecDeque<(K, DateTime<Utc>)>,
}

/// Bounded cache with a fixed time to live.
pub struct TtlCache<K, V> {
    ttl: TimeDelta,
    max_entries: usize,
    clock: Arc<dyn Clock>,
    inner: Mutex<Inner<K, V>>,
}

impl<K, V> fmt::Debug for TtlCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TtlCache")
            .field("ttl", &self.ttl)
            .field("max_entries", &self.max_entries)
            .finish_non_exhaustive()
    }
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Creates a cache holding at most `max_entries` (at least one) values
    /// for `ttl` each.
    #[must_use]
    pub fn new(ttl: Duration, max_entries: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl: TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX),
            max_entries: max_entries.max(1),
            clock,
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                order: VecDeque::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<K, V>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_fresh(&self, inserted_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(inserted_at) < self.ttl
    }

    /// Returns the live value for `key`. Expired values are dropped.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<V> {
        let now = self.clock.now();
        let mut inner = self.lock();
        let inserted_at = inner.entries.get(key)?.inserted_at;
        if self.is_fresh(inserted_at, now) {
            return inner.entries.get(key).map(|e| e.value.clone());
        }
        inner.entries.remove(key);
        None
    }

    /// Stores `value` under `key`, evicting the oldest entry at capacity.
    pub fn insert(&self, key: K, value: V) {
        let now = self.clock.now();
        let mut inner = self.lock();
        if !inner.entries.contains_key(&key) {
            while inner.entries.len() >= self.max_entries {
                let Some((oldest, at)) = inner.order.pop_front() else {
                    break;
                };
                if inner.entries.get(&oldest).is_some_and(|e| e.inserted_at == at) {
                    inner.entries.remove(&oldest);
                }
            }
        }
        inner.order.push_back((key.clone(), now));
        inner.entries.insert(
            key,
            Entry {
                value,
                inserted_at: now,
            },
        );
    }

    /// Drops every entry.
    pub fn invalidate_all(&self) {
        let mut inner = self.lock();
        inner.entries.clear();
        inner.order.clear();
    }

    /// Entries currently held, expired ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Returns `true` if the cache holds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
