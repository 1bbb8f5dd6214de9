//! Builder: configuration for [`WeakConcurrentMap`].

use crate::cleaner::{Cleaner, Cleanup};
use crate::error::Error;
use crate::map::{DefaultFn, WeakConcurrentMap};
use crate::shared::Shared;
use crate::table::Table;
use core::hash::BuildHasher;
use core::num::NonZeroUsize;
use std::collections::hash_map::RandomState;
use std::sync::Arc;
use std::thread;

const DEFAULT_THREAD_NAME: &str = "weak-map-cleaner";
const SHARDS_PER_CPU: usize = 4;

/// Configures and builds a [`WeakConcurrentMap`].
///
/// ```
/// use weak_concurrent_map::{Cleanup, Key, WeakConcurrentMap};
///
/// let map = WeakConcurrentMap::<String, u32>::builder()
///     .cleanup(Cleanup::Inline)
///     .shards(8)
///     .compute_default(|s: &String| Some(s.len() as u32))
///     .build()
///     .unwrap();
///
/// let key = Key::new("four".to_string());
/// assert_eq!(map.get(&key), Some(4));
/// assert!(map.contains_key(&key));
/// ```
pub struct Builder<K, V, S = RandomState> {
    cleanup: Cleanup,
    shards: Option<usize>,
    capacity: usize,
    hasher: S,
    thread_name: String,
    compute_default: Option<DefaultFn<K, V>>,
}

impl<K, V> Builder<K, V> {
    pub fn new() -> Self {
        Self {
            cleanup: Cleanup::default(),
            shards: None,
            capacity: 0,
            hasher: RandomState::new(),
            thread_name: DEFAULT_THREAD_NAME.to_string(),
            compute_default: None,
        }
    }
}

impl<K, V> Default for Builder<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> Builder<K, V, S> {
    pub fn cleanup(mut self, cleanup: Cleanup) -> Self {
        self.cleanup = cleanup;
        self
    }

    /// Number of lock stripes, rounded up to a power of two. Defaults to
    /// four per available CPU.
    pub fn shards(mut self, shards: usize) -> Self {
        self.shards = Some(shards);
        self
    }

    /// Initial capacity, spread over the shards.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Name of the background cleaner thread.
    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    /// Hook consulted when `get` misses. A `Some` result is stored under the
    /// key and returned. Racing misses on one key may each run the hook;
    /// the last insert wins.
    pub fn compute_default<F>(mut self, f: F) -> Self
    where
        F: Fn(&K) -> Option<V> + Send + Sync + 'static,
    {
        self.compute_default = Some(Box::new(f));
        self
    }

    pub fn hasher<S2>(self, hasher: S2) -> Builder<K, V, S2> {
        Builder {
            cleanup: self.cleanup,
            shards: self.shards,
            capacity: self.capacity,
            hasher,
            thread_name: self.thread_name,
            compute_default: self.compute_default,
        }
    }
}

impl<K, V, S> Builder<K, V, S>
where
    S: BuildHasher,
{
    /// Builds the map without starting a worker, whatever the strategy.
    pub(crate) fn assemble(self) -> (WeakConcurrentMap<K, V, S>, String) {
        let shards = self.shards.unwrap_or_else(|| {
            thread::available_parallelism().map_or(1, NonZeroUsize::get) * SHARDS_PER_CPU
        });
        let table = Table::new(shards, self.capacity, self.hasher);
        let map = WeakConcurrentMap::from_parts(
            Arc::new(Shared::new(table)),
            self.cleanup,
            self.compute_default,
        );
        (map, self.thread_name)
    }
}

impl<K, V, S> Builder<K, V, S>
where
    K: Send + Sync + 'static,
    V: Send + Sync + 'static,
    S: BuildHasher + Send + Sync + 'static,
{
    /// Builds the map, starting the cleaner thread for
    /// [`Cleanup::Background`].
    pub fn build(self) -> Result<WeakConcurrentMap<K, V, S>, Error> {
        let (mut map, thread_name) = self.assemble();
        if map.cleanup() == Cleanup::Background {
            let cleaner = Cleaner::spawn(thread_name, map.shared_handle())?;
            map.attach(cleaner);
        }
        Ok(map)
    }
}
