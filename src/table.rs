//! Table: striped concurrent identity table.
//!
//! The table splits its entries over a power-of-two number of [`Shard`]s,
//! each behind its own `RwLock`. A key's shard is chosen from the upper half
//! of its stored hash; the shard's index uses the low bits, so the two
//! selections stay independent. Locks are held for a single shard
//! operation only and never while user code runs, apart from the value
//! accessor passed to [`Table::with`].

use crate::key::Key;
use crate::shard::Shard;
use crate::weak_key::WeakKey;
use core::hash::BuildHasher;
use parking_lot::RwLock;

pub(crate) struct Table<K, V, S> {
    hasher: S,
    shards: Box<[RwLock<Shard<K, V>>]>,
}

impl<K, V, S> Table<K, V, S>
where
    S: BuildHasher,
{
    /// `shards` is rounded up to a power of two; `capacity` is spread
    /// evenly over them.
    pub(crate) fn new(shards: usize, capacity: usize, hasher: S) -> Self {
        let count = shards.max(1).next_power_of_two();
        let per_shard = capacity.div_ceil(count);
        Self {
            hasher,
            shards: (0..count)
                .map(|_| RwLock::new(Shard::with_capacity(per_shard)))
                .collect(),
        }
    }

    /// The hash a key is filed under in this table. Derived from the key's
    /// id, so it is the same before and after the key is released.
    pub(crate) fn hash(&self, key: &Key<K>) -> u64 {
        self.hasher.hash_one(key.id())
    }

    fn shard(&self, hash: u64) -> &RwLock<Shard<K, V>> {
        let mask = self.shards.len() - 1;
        &self.shards[(hash >> 32) as usize & mask]
    }

    pub(crate) fn shard_count(&self) -> usize {
        self.shards.len()
    }

    pub(crate) fn with<R, F>(&self, key: &Key<K>, f: F) -> Option<R>
    where
        F: FnOnce(&V) -> R,
    {
        let hash = self.hash(key);
        self.shard(hash).read().get(hash, key).map(f)
    }

    pub(crate) fn contains(&self, key: &Key<K>) -> bool {
        let hash = self.hash(key);
        self.shard(hash).read().contains(hash, key)
    }

    pub(crate) fn insert(&self, key: WeakKey<K>, value: V) -> Option<V> {
        let hash = key.hash();
        self.shard(hash).write().insert(key, value)
    }

    pub(crate) fn remove(&self, key: &Key<K>) -> Option<V> {
        let hash = self.hash(key);
        self.shard(hash).write().remove(hash, key)
    }

    pub(crate) fn expunge(&self, stale: &WeakKey<K>) -> Option<V> {
        self.shard(stale.hash()).write().expunge(stale)
    }

    /// Removes every entry and returns how many were discarded. Values are
    /// dropped shard by shard, each after its lock is released.
    pub(crate) fn clear(&self) -> usize {
        let mut discarded = 0;
        for shard in self.shards.iter() {
            let values = shard.write().drain();
            discarded += values.len();
            drop(values);
        }
        discarded
    }

    /// Number of entries, stale ones included. Concurrent writers may make
    /// the result outdated before it is returned.
    pub(crate) fn len(&self) -> usize {
        self.shards.iter().map(|s| s.read().len()).sum()
    }
}
