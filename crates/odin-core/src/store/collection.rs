// ── Generic concurrent keyed collection ──
//
// Sharded `DashMap` storage of shared entities. Every operation touches
// a single key; there is no compound read-modify-write across calls.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

/// A concurrent map of `Arc`-shared entities keyed by identity.
///
/// Writes lock only the shard owning the key. `snapshot()` copies the
/// current `Arc`s out so callers can iterate while other handlers keep
/// mutating.
pub(crate) struct Collection<K, V>
where
    K: Eq + Hash + Clone,
{
    entries: DashMap<K, Arc<V>>,
}

impl<K, V> Collection<K, V>
where
    K: Eq + Hash + Clone,
{
    pub(crate) fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Insert, silently replacing any existing entry (last writer wins).
    /// Returns the replaced entity.
    pub(crate) fn insert(&self, key: K, entity: Arc<V>) -> Option<Arc<V>> {
        self.entries.insert(key, entity)
    }

    /// Return the entry for `key`, creating it with `make` if absent.
    /// The boolean is `true` when the entry was created by this call.
    ///
    /// Atomic per key: concurrent callers for the same key agree on
    /// exactly one creator.
    pub(crate) fn get_or_insert_with(&self, key: K, make: impl FnOnce() -> V) -> (Arc<V>, bool) {
        match self.entries.entry(key) {
            Entry::Occupied(existing) => (Arc::clone(existing.get()), false),
            Entry::Vacant(slot) => {
                let entity = Arc::new(make());
                slot.insert(Arc::clone(&entity));
                (entity, true)
            }
        }
    }

    /// Remove an entity by key. Returns the removed entity if it existed.
    pub(crate) fn remove(&self, key: &K) -> Option<Arc<V>> {
        self.entries.remove(key).map(|(_, v)| v)
    }

    pub(crate) fn get(&self, key: &K) -> Option<Arc<V>> {
        self.entries.get(key).map(|r| Arc::clone(r.value()))
    }

    pub(crate) fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Point-in-time copy of every entry.
    pub(crate) fn snapshot(&self) -> HashMap<K, Arc<V>> {
        self.entries
            .iter()
            .map(|r| (r.key().clone(), Arc::clone(r.value())))
            .collect()
    }

    /// Entities matching `pred`, collected without holding any lock
    /// past the iteration.
    pub(crate) fn filter(&self, mut pred: impl FnMut(&V) -> bool) -> Vec<Arc<V>> {
        self.entries
            .iter()
            .filter(|r| pred(r.value()))
            .map(|r| Arc::clone(r.value()))
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
