//! Shard: structural identity table with stable slot storage.
//!
//! One shard is a `HashTable` index of slot keys over a `SlotMap` holding
//! the entries. Every entry stores the hash its wrapper was built with and
//! the index only ever rehashes through that stored value, so neither `K`
//! nor its wrapper is consulted when the index grows.
//!
//! A shard is not synchronized; [`Table`](crate::table::Table) puts each
//! one behind its own lock. Methods that take an entry out return the value
//! instead of dropping it so the caller can release the lock first.

use crate::key::Key;
use crate::weak_key::WeakKey;
use hashbrown::HashTable;
use slotmap::{DefaultKey, SlotMap};

#[derive(Debug)]
struct Entry<K, V> {
    key: WeakKey<K>,
    value: V,
}

pub(crate) struct Shard<K, V> {
    index: HashTable<DefaultKey>,
    slots: SlotMap<DefaultKey, Entry<K, V>>,
}

impl<K, V> Shard<K, V> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            index: HashTable::with_capacity(capacity),
            slots: SlotMap::with_capacity_and_key(capacity),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn find<F>(&self, hash: u64, mut is_match: F) -> Option<DefaultKey>
    where
        F: FnMut(&WeakKey<K>) -> bool,
    {
        self.index
            .find(hash, |&k| {
                self.slots
                    .get(k)
                    .map(|e| e.key.hash() == hash && is_match(&e.key))
                    .unwrap_or(false)
            })
            .copied()
    }

    /// Looks up the value stored for the live `key`.
    pub(crate) fn get(&self, hash: u64, key: &Key<K>) -> Option<&V> {
        let k = self.find(hash, |w| w.refers_to(key))?;
        self.slots.get(k).map(|e| &e.value)
    }

    pub(crate) fn contains(&self, hash: u64, key: &Key<K>) -> bool {
        self.find(hash, |w| w.refers_to(key)).is_some()
    }

    /// Stores `value` under `key`. If an equivalent wrapper is already
    /// present, its value is replaced and returned; the existing wrapper is
    /// kept.
    pub(crate) fn insert(&mut self, key: WeakKey<K>, value: V) -> Option<V> {
        let hash = key.hash();
        if let Some(entry) = self
            .find(hash, |w| w.is_equivalent(&key))
            .and_then(|k| self.slots.get_mut(k))
        {
            return Some(core::mem::replace(&mut entry.value, value));
        }

        let k = self.slots.insert(Entry { key, value });
        let slots = &self.slots;
        self.index.insert_unique(hash, k, |&kk| {
            slots.get(kk).map(|e| e.key.hash()).unwrap_or(0)
        });
        None
    }

    fn remove_where<F>(&mut self, hash: u64, mut is_match: F) -> Option<V>
    where
        F: FnMut(&WeakKey<K>) -> bool,
    {
        let slots = &self.slots;
        let (k, _) = self
            .index
            .find_entry(hash, |&kk| {
                slots
                    .get(kk)
                    .map(|e| e.key.hash() == hash && is_match(&e.key))
                    .unwrap_or(false)
            })
            .ok()?
            .remove();
        self.slots.remove(k).map(|e| e.value)
    }

    /// Removes the entry of the live `key`.
    pub(crate) fn remove(&mut self, hash: u64, key: &Key<K>) -> Option<V> {
        self.remove_where(hash, |w| w.refers_to(key))
    }

    /// Removes one entry equivalent to the expired wrapper `stale`: the
    /// first entry in its bucket with the same hash whose referent is gone
    /// as well. Live entries never match.
    pub(crate) fn expunge(&mut self, stale: &WeakKey<K>) -> Option<V> {
        debug_assert!(stale.is_expired(), "expunge called with a live wrapper");
        self.remove_where(stale.hash(), |w| w.is_equivalent(stale))
    }

    /// Empties the shard, handing back the values.
    pub(crate) fn drain(&mut self) -> Vec<V> {
        self.index.clear();
        self.slots.drain().map(|(_, e)| e.value).collect()
    }
}
