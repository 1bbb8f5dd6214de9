//! Shared-owner key handles that announce their own release.
//!
//! A [`Key`] is a reference-counted handle around a user value. Maps never
//! hold a `Key`; they hold a [`WeakKey`] observing the same allocation. When
//! a key is stored in a map, the map registers an observer on the key. Once
//! the last strong owner drops, every registered observer pushes its
//! wrapper to the owning map's notification queue, which is how maps learn
//! that an entry went stale.
//!
//! Each key also carries a [`KeyId`] drawn from a process-wide counter at
//! construction. Maps hash the id, never the value, so keys need no
//! `Hash`/`Eq` and the hash stays valid after the value is gone.

use crate::weak_key::WeakKey;
use core::fmt;
use core::ops::Deref;
use core::ptr;
use core::sync::atomic::{AtomicU64, Ordering};
use crossbeam_channel::Sender;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};

static NEXT_KEY_ID: AtomicU64 = AtomicU64::new(0);

/// Stable, process-unique identifier of a [`Key`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct KeyId(u64);

impl KeyId {
    fn next() -> Self {
        KeyId(NEXT_KEY_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

/// Identity and liveness of a map. Observers hold a weak handle to it, so
/// a key registers at most once per map and can tell when a map is gone.
#[derive(Debug)]
pub(crate) struct MapId(Arc<()>);

impl MapId {
    pub(crate) fn new() -> Self {
        MapId(Arc::new(()))
    }
}

struct Observer<T> {
    map: Weak<()>,
    queue: Sender<WeakKey<T>>,
    key: WeakKey<T>,
}

pub(crate) struct KeyInner<T> {
    id: KeyId,
    observers: Mutex<Vec<Observer<T>>>,
    value: T,
}

impl<T> Drop for KeyInner<T> {
    fn drop(&mut self) {
        // The strong count is already zero here, so every wrapper sent below
        // observes an expired referent.
        for observer in self.observers.get_mut().drain(..) {
            // A disconnected queue means the map is gone; nothing to purge.
            let _ = observer.queue.send(observer.key);
        }
    }
}

/// A shared-owner handle usable as a key of
/// [`WeakConcurrentMap`](crate::WeakConcurrentMap).
///
/// Cloning a `Key` shares ownership of the same value. Maps compare keys by
/// identity: two keys built from equal values are different keys.
///
/// ```
/// use weak_concurrent_map::Key;
///
/// let a = Key::new(String::from("x"));
/// let b = a.clone();
/// let c = Key::new(String::from("x"));
///
/// assert!(Key::ptr_eq(&a, &b));
/// assert!(!Key::ptr_eq(&a, &c));
/// assert_eq!(*a, *c);
/// ```
pub struct Key<T> {
    inner: Arc<KeyInner<T>>,
}

impl<T> Key<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(KeyInner {
                id: KeyId::next(),
                observers: Mutex::new(Vec::new()),
                value,
            }),
        }
    }

    pub fn id(&self) -> KeyId {
        self.inner.id
    }

    /// Returns `true` if both handles share the same allocation.
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        Arc::ptr_eq(&this.inner, &other.inner)
    }

    /// Number of strong owners currently holding this key.
    pub fn strong_count(this: &Self) -> usize {
        Arc::strong_count(&this.inner)
    }

    pub(crate) fn as_arc(&self) -> &Arc<KeyInner<T>> {
        &self.inner
    }

    /// Builds a wrapper for this key and makes sure the key reports its
    /// release to `queue`. Registration happens at most once per map; later
    /// calls for the same map only build the wrapper. Observers of maps that
    /// have been dropped are pruned on the way.
    pub(crate) fn register(&self, map: &MapId, hash: u64, queue: &Sender<WeakKey<T>>) -> WeakKey<T> {
        let weak = WeakKey::new(self, hash);
        let mut observers = self.inner.observers.lock();
        observers.retain(|o| o.map.strong_count() > 0);
        if !observers.iter().any(|o| ptr::eq(o.map.as_ptr(), Arc::as_ptr(&map.0))) {
            observers.push(Observer {
                map: Arc::downgrade(&map.0),
                queue: queue.clone(),
                key: weak.clone(),
            });
        }
        weak
    }

    #[cfg(test)]
    pub(crate) fn observer_count(&self) -> usize {
        self.inner.observers.lock().len()
    }
}

impl<T> Clone for Key<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Deref for Key<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner.value
    }
}

impl<T> AsRef<T> for Key<T> {
    fn as_ref(&self) -> &T {
        &self.inner.value
    }
}

impl<T> From<T> for Key<T> {
    fn from(value: T) -> Self {
        Key::new(value)
    }
}

impl<T: fmt::Debug> fmt::Debug for Key<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Key")
            .field("id", &self.inner.id.0)
            .field("value", &self.inner.value)
            .finish()
    }
}
