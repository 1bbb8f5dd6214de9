//! WeakKey: the non-owning wrapper stored in the table.

use crate::key::{Key, KeyInner};
use core::fmt;
use std::sync::{Arc, Weak};

/// A weak reference to a [`Key`] plus the hash the owning map computed for
/// it when it was wrapped.
///
/// The hash is fixed at construction and never recomputed, so an expired
/// wrapper still lands in the bucket its live key occupied. A `WeakKey`
/// holds the allocation (not the value) alive, so its address is never
/// reused by another key while the wrapper exists.
pub(crate) struct WeakKey<T> {
    inner: Weak<KeyInner<T>>,
    hash: u64,
}

impl<T> WeakKey<T> {
    pub(crate) fn new(key: &Key<T>, hash: u64) -> Self {
        Self {
            inner: Arc::downgrade(key.as_arc()),
            hash,
        }
    }

    pub(crate) fn hash(&self) -> u64 {
        self.hash
    }

    /// `true` once every strong owner of the referent has been dropped.
    pub(crate) fn is_expired(&self) -> bool {
        self.inner.strong_count() == 0
    }

    /// Identity match against a live key held by the caller.
    pub(crate) fn refers_to(&self, key: &Key<T>) -> bool {
        core::ptr::eq(self.inner.as_ptr(), Arc::as_ptr(key.as_arc()))
    }

    /// Wrapper equality: same referent, or both referents released.
    ///
    /// The second clause is what lets an expired wrapper pulled from the
    /// notification queue remove a stale entry without knowing which key
    /// it belonged to.
    pub(crate) fn is_equivalent(&self, other: &WeakKey<T>) -> bool {
        Weak::ptr_eq(&self.inner, &other.inner) || (self.is_expired() && other.is_expired())
    }
}

impl<T> Clone for WeakKey<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
            hash: self.hash,
        }
    }
}

impl<T> fmt::Debug for WeakKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakKey")
            .field("hash", &self.hash)
            .field("expired", &self.is_expired())
            .finish()
    }
}
