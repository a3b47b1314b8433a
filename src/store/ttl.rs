//! TTL-keyed append log
//!
//! A per-key, time-ordered append log with lazy eviction of entries older
//! than a configured retention window. Backs the data cache, the trend
//! history, the rate limiter, the session table, the token denylist, and the
//! progress tracker.
//!
//! # Concurrency
//!
//! Keys live in a [`DashMap`], which shards by key hash. Every operation on a
//! key runs under that key's shard lock, so operations on one key are
//! linearizable and operations on keys in different shards never contend.
//!
//! # Eviction
//!
//! An entry is visible iff `now - entry.timestamp < retention`. Eviction is
//! lazy: any read or write touching a key first drops that key's expired
//! entries. [`TtlKeyedStore::sweep`] does the same for every key and is meant
//! for periodic housekeeping.

use super::clock::Clock;
use super::types::TimeRange;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::borrow::Borrow;
use std::hash::Hash;
use std::sync::Arc;

/// How long entries stay visible
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retention {
    /// Entries expire once `now - timestamp >= window`
    Window(Duration),
    /// Entries never expire; removal is explicit
    Forever,
}

impl Retention {
    pub fn days(days: i64) -> Self {
        Retention::Window(Duration::days(days))
    }

    pub fn seconds(secs: i64) -> Self {
        Retention::Window(Duration::seconds(secs))
    }

    /// Whether an entry stamped `timestamp` is still visible at `now`
    pub fn is_live(&self, timestamp: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        match self {
            Retention::Window(window) => now - timestamp < *window,
            Retention::Forever => true,
        }
    }
}

/// A value and the instant it was recorded under
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entry<V> {
    pub timestamp: DateTime<Utc>,
    pub value: V,
}

/// Generic per-key append log with retention-based eviction
pub struct TtlKeyedStore<K, V>
where
    K: Eq + Hash,
{
    /// Store name used in log fields
    name: &'static str,
    /// key → entries in arrival order
    entries: DashMap<K, Vec<Entry<V>>>,
    retention: Retention,
    clock: Arc<dyn Clock>,
}

impl<K, V> TtlKeyedStore<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(name: &'static str, retention: Retention, clock: Arc<dyn Clock>) -> Self {
        Self {
            name,
            entries: DashMap::new(),
            retention,
            clock,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn retention(&self) -> Retention {
        self.retention
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Append a value under `key`
    ///
    /// Returns false when the value was already outside the retention window
    /// and therefore not kept.
    pub fn append(&self, key: K, value: V, timestamp: DateTime<Utc>) -> bool {
        let now = self.clock.now();
        let mut slot = self.entries.entry(key).or_default();
        let evicted = evict(&mut slot, self.retention, now);

        let retained = self.retention.is_live(timestamp, now);
        if retained {
            slot.push(Entry { timestamp, value });
        }

        tracing::trace!(
            store = self.name,
            evicted,
            retained,
            len = slot.len(),
            "Appended entry"
        );
        retained
    }

    /// Replace everything under `key` with a single entry
    pub fn replace(&self, key: K, value: V, timestamp: DateTime<Utc>) {
        let mut slot = self.entries.entry(key).or_default();
        slot.clear();
        slot.push(Entry { timestamp, value });
    }

    /// Values under `key` within `range`, defaulting to the full retained window
    pub fn get<Q>(&self, key: &Q, range: Option<TimeRange>) -> Vec<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries(key, range)
            .into_iter()
            .map(|entry| entry.value)
            .collect()
    }

    /// Timestamped entries under `key` within `range`, in arrival order
    pub fn entries<Q>(&self, key: &Q, range: Option<TimeRange>) -> Vec<Entry<V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let now = self.clock.now();
        let Some(mut slot) = self.entries.get_mut(key) else {
            return Vec::new();
        };
        evict(&mut slot, self.retention, now);

        slot.iter()
            .filter(|entry| range.map_or(true, |r| r.contains(entry.timestamp)))
            .cloned()
            .collect()
    }

    /// Number of visible entries under `key`
    pub fn len<Q>(&self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let now = self.clock.now();
        match self.entries.get_mut(key) {
            Some(mut slot) => {
                evict(&mut slot, self.retention, now);
                slot.len()
            }
            None => 0,
        }
    }

    /// Remove entries under `key` that are expired as of `now`
    ///
    /// Returns the number of entries removed.
    pub fn prune<Q>(&self, key: &Q, now: DateTime<Utc>) -> usize
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let removed = match self.entries.get_mut(key) {
            Some(mut slot) => evict(&mut slot, self.retention, now),
            None => return 0,
        };
        self.entries.remove_if(key, |_, slot| slot.is_empty());
        removed
    }

    /// Atomic read-modify-write on the live entries of `key`
    ///
    /// The closure runs under the key's lock after expired entries have been
    /// dropped, and receives the current instant. The key is created if it
    /// does not exist yet.
    pub fn update<R>(&self, key: K, f: impl FnOnce(&mut Vec<Entry<V>>, DateTime<Utc>) -> R) -> R {
        let now = self.clock.now();
        let result = {
            let mut slot = self.entries.entry(key.clone()).or_default();
            evict(&mut slot, self.retention, now);
            f(&mut slot, now)
        };
        self.entries.remove_if(&key, |_, slot| slot.is_empty());
        result
    }

    /// Like [`update`](Self::update), but only when `key` has live entries
    pub fn update_existing<Q, R>(
        &self,
        key: &Q,
        f: impl FnOnce(&mut Vec<Entry<V>>, DateTime<Utc>) -> R,
    ) -> Option<R>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let now = self.clock.now();
        let result = {
            let mut slot = self.entries.get_mut(key)?;
            evict(&mut slot, self.retention, now);
            if slot.is_empty() {
                None
            } else {
                Some(f(&mut slot, now))
            }
        };
        self.entries.remove_if(key, |_, slot| slot.is_empty());
        result
    }

    /// Drop everything under `key`, returning what was visible
    pub fn remove<Q>(&self, key: &Q) -> Vec<Entry<V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let now = self.clock.now();
        self.entries
            .remove(key)
            .map(|(_, slot)| {
                slot.into_iter()
                    .filter(|entry| self.retention.is_live(entry.timestamp, now))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Evict expired entries under every key and drop empty keys
    ///
    /// Returns the number of entries removed.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let mut removed = 0;

        self.entries.retain(|_, slot| {
            removed += evict(slot, self.retention, now);
            !slot.is_empty()
        });

        if removed > 0 {
            tracing::debug!(store = self.name, removed, "Swept expired entries");
        }
        removed
    }

    /// Number of keys currently held, including ones not yet swept
    pub fn key_count(&self) -> usize {
        self.entries.len()
    }

    pub fn keys(&self) -> Vec<K> {
        self.entries.iter().map(|item| item.key().clone()).collect()
    }
}

/// Drop expired entries in place, preserving arrival order
fn evict<V>(slot: &mut Vec<Entry<V>>, retention: Retention, now: DateTime<Utc>) -> usize {
    let before = slot.len();
    slot.retain(|entry| retention.is_live(entry.timestamp, now));
    before - slot.len()
}
