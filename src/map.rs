//! WeakConcurrentMap: the public, identity-keyed weak map.

use crate::builder::Builder;
use crate::cleaner::{self, Cleaner, Cleanup};
use crate::error::Error;
use crate::key::Key;
use crate::shared::Shared;
use core::fmt;
use core::hash::BuildHasher;
use crossbeam_channel::Receiver;
use log::{debug, trace, warn};
use std::collections::hash_map::RandomState;
use std::sync::Arc;

pub(crate) type DefaultFn<K, V> = Box<dyn Fn(&K) -> Option<V> + Send + Sync>;

/// A thread-safe map with weak keys compared by identity.
///
/// An entry lives as long as some [`Key`] clone is held outside the map.
/// Once the last one is dropped the entry is stale and gets purged by the
/// map's [`Cleanup`] strategy. Keys need neither `Hash` nor `Eq`: two keys
/// built from equal values are different keys.
///
/// ```
/// use weak_concurrent_map::{Key, WeakConcurrentMap};
///
/// let map = WeakConcurrentMap::with_inlined_expunction();
/// let a = Key::new("same".to_string());
/// let b = Key::new("same".to_string());
///
/// map.put(&a, 1);
/// assert_eq!(map.get(&a), Some(1));
/// assert_eq!(map.get(&b), None);
///
/// drop(a);
/// map.expunge_stale_entries();
/// assert!(map.is_empty());
/// ```
pub struct WeakConcurrentMap<K, V, S = RandomState> {
    shared: Arc<Shared<K, V, S>>,
    cleanup: Cleanup,
    cleaner: Option<Cleaner>,
    compute_default: Option<DefaultFn<K, V>>,
}

impl<K, V> WeakConcurrentMap<K, V>
where
    K: Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    /// Creates a map with default settings. With `cleaner_thread` a
    /// background worker purges stale entries; without it nothing is purged
    /// until [`expunge_stale_entries`](Self::expunge_stale_entries) is
    /// called.
    pub fn new(cleaner_thread: bool) -> Result<Self, Error> {
        let cleanup = if cleaner_thread {
            Cleanup::Background
        } else {
            Cleanup::Manual
        };
        Builder::new().cleanup(cleanup).build()
    }
}

impl<K, V> WeakConcurrentMap<K, V> {
    /// Creates a map that purges stale entries as a side effect of `get`,
    /// `put`, `remove` and `contains_key`.
    pub fn with_inlined_expunction() -> Self {
        Builder::new().cleanup(Cleanup::Inline).assemble().0
    }

    pub fn builder() -> Builder<K, V> {
        Builder::new()
    }
}

impl<K, V, S> WeakConcurrentMap<K, V, S> {
    pub(crate) fn from_parts(
        shared: Arc<Shared<K, V, S>>,
        cleanup: Cleanup,
        compute_default: Option<DefaultFn<K, V>>,
    ) -> Self {
        Self {
            shared,
            cleanup,
            cleaner: None,
            compute_default,
        }
    }

    pub(crate) fn shared_handle(&self) -> Arc<Shared<K, V, S>> {
        Arc::clone(&self.shared)
    }

    pub(crate) fn attach(&mut self, cleaner: Cleaner) {
        self.cleaner = Some(cleaner);
    }

    pub fn cleanup(&self) -> Cleanup {
        self.cleanup
    }

    /// The background worker, if this map was built with one.
    pub fn cleaner(&self) -> Option<&Cleaner> {
        self.cleaner.as_ref()
    }

    /// Number of lock stripes backing the map.
    pub fn shards(&self) -> usize
    where
        S: BuildHasher,
    {
        self.shared.table.shard_count()
    }
}

impl<K, V, S> WeakConcurrentMap<K, V, S>
where
    S: BuildHasher,
{
    fn expunge_if_inline(&self) {
        let inline = match self.cleanup {
            Cleanup::Inline => true,
            Cleanup::Background => !self.cleaner.as_ref().is_some_and(Cleaner::is_running),
            Cleanup::Manual => false,
        };
        if inline {
            let purged = self.shared.expunge_pending();
            if purged > 0 {
                trace!("inline expunction purged {} stale entries", purged);
            }
        }
    }

    /// Returns a clone of the value stored for `key`.
    ///
    /// On a miss the `compute_default` hook, if configured, may supply a
    /// value, which is then stored and returned. Concurrent misses on one
    /// key can each run the hook; the last insert wins.
    pub fn get(&self, key: &Key<K>) -> Option<V>
    where
        V: Clone,
    {
        self.expunge_if_inline();
        if let Some(value) = self.shared.table.with(key, V::clone) {
            return Some(value);
        }
        let value = (self.compute_default.as_ref()?)(&**key)?;
        let _previous = self.shared.insert(key, value.clone());
        Some(value)
    }

    /// Applies `f` to the value stored for `key` without cloning it. The
    /// default hook is not consulted.
    ///
    /// # Deadlocks
    ///
    /// `f` runs while the key's shard is read-locked. Calling a writing
    /// method of this map (`put`, `remove`, `clear`, or `get` with a default
    /// hook) from inside `f` may deadlock. Compute inside `f` and write
    /// after `with` has returned:
    ///
    /// ```
    /// use weak_concurrent_map::{Key, WeakConcurrentMap};
    ///
    /// let map = WeakConcurrentMap::with_inlined_expunction();
    /// let key = Key::new("hits");
    /// map.put(&key, vec![1, 2]);
    ///
    /// let next = map.with(&key, |v| v.len() + 1).unwrap();
    /// map.put(&key, vec![0; next]);
    /// assert_eq!(map.with(&key, Vec::len), Some(3));
    /// ```
    pub fn with<R, F>(&self, key: &Key<K>, f: F) -> Option<R>
    where
        F: FnOnce(&V) -> R,
    {
        self.expunge_if_inline();
        self.shared.table.with(key, f)
    }

    /// Associates `value` with `key`, returning the value it replaces.
    pub fn put(&self, key: &Key<K>, value: V) -> Option<V> {
        self.expunge_if_inline();
        self.shared.insert(key, value)
    }

    /// Removes the entry for `key`, returning its value.
    pub fn remove(&self, key: &Key<K>) -> Option<V> {
        self.expunge_if_inline();
        self.shared.table.remove(key)
    }

    pub fn contains_key(&self, key: &Key<K>) -> bool {
        self.expunge_if_inline();
        self.shared.table.contains(key)
    }

    /// Removes every entry. Notifications still in flight for removed keys
    /// turn into no-ops when they are drained.
    pub fn clear(&self) {
        self.shared.table.clear();
    }

    /// Number of entries, counting stale entries that have not been purged
    /// yet.
    pub fn len(&self) -> usize {
        self.shared.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Purges the stale entries reported so far, without blocking. Returns
    /// how many entries were removed.
    pub fn expunge_stale_entries(&self) -> usize {
        self.shared.expunge_pending()
    }

    /// Runs the cleaner loop on the calling thread, for maps whose owner
    /// hosts cleanup itself (typically [`Cleanup::Manual`]).
    ///
    /// Blocks, purging stale entries as keys are released, until `cancel`
    /// receives a message or all of its senders are dropped. On the way out
    /// the map is cleared, exactly as when the background worker is
    /// cancelled.
    ///
    /// ```
    /// use std::sync::Arc;
    /// use std::thread;
    /// use weak_concurrent_map::{Key, WeakConcurrentMap};
    ///
    /// let map = Arc::new(WeakConcurrentMap::<u32, u32>::new(false).unwrap());
    /// let (stop, cancel) = crossbeam_channel::bounded(1);
    /// let host = {
    ///     let map = Arc::clone(&map);
    ///     thread::spawn(move || map.run_cleaner(&cancel))
    /// };
    ///
    /// map.put(&Key::new(1), 1);
    /// stop.send(()).unwrap();
    /// host.join().unwrap();
    /// assert!(map.is_empty());
    /// ```
    pub fn run_cleaner(&self, cancel: &Receiver<()>) {
        debug!("running cleaner loop on `{}`", std::thread::current().name().unwrap_or("<unnamed>"));
        cleaner::run(&self.shared, cancel);
    }

    /// Like [`get`](Self::get), for callers whose key may be absent.
    pub fn try_get(&self, key: Option<&Key<K>>) -> Result<Option<V>, Error>
    where
        V: Clone,
    {
        let key = key.ok_or(Error::InvalidArgument("key"))?;
        Ok(self.get(key))
    }

    /// Like [`put`](Self::put), for callers whose key or value may be
    /// absent. Nothing is changed when either is missing.
    pub fn try_put(&self, key: Option<&Key<K>>, value: Option<V>) -> Result<Option<V>, Error> {
        let key = key.ok_or(Error::InvalidArgument("key"))?;
        let value = value.ok_or(Error::InvalidArgument("value"))?;
        Ok(self.put(key, value))
    }

    /// Like [`remove`](Self::remove), for callers whose key may be absent.
    pub fn try_remove(&self, key: Option<&Key<K>>) -> Result<Option<V>, Error> {
        let key = key.ok_or(Error::InvalidArgument("key"))?;
        Ok(self.remove(key))
    }
}

impl<K, V, S> Drop for WeakConcurrentMap<K, V, S> {
    fn drop(&mut self) {
        if let Some(cleaner) = &self.cleaner {
            if let Err(e) = cleaner.shutdown() {
                warn!("cleaner thread `{}` did not shut down cleanly: {}", cleaner.name(), e);
            }
        }
    }
}

impl<K, V, S> fmt::Debug for WeakConcurrentMap<K, V, S>
where
    S: BuildHasher,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakConcurrentMap")
            .field("cleanup", &self.cleanup)
            .field("len", &self.len())
            .field("cleaner", &self.cleaner)
            .finish()
    }
}
