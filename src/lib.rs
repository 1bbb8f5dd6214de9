//! weak-concurrent-map: a thread-safe side-table keyed by object identity
//! that forgets an entry once its key is no longer owned anywhere else.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: attach values to objects (e.g. "already processed", cached
//!   derived data) without the attachment keeping the object alive, and
//!   without leaking entries for objects that are gone.
//! - Layers:
//!   - `Key<T>`: shared-owner handle with a stable `KeyId`; when its last
//!     owner drops it announces the release to every map it was put into.
//!   - `WeakKey<T>`: non-owning wrapper with the hash computed once at wrap
//!     time; equal to another wrapper iff same referent or both released.
//!   - `Shard<K, V>`: structural identity table (`HashTable` index over
//!     `SlotMap` storage, stored hash per entry).
//!   - `Table<K, V, S>`: power-of-two striped shards behind `RwLock`s.
//!   - `WeakConcurrentMap<K, V, S>`: public API plus a pluggable
//!     `Cleanup` strategy (background worker, inline, manual).
//!
//! Stale-entry removal
//! - A released key pushes its registered `WeakKey` to the map's queue.
//!   The wrapper's referent is gone, so it cannot be compared by identity.
//! - Removal instead goes by the stored hash to the right shard and bucket
//!   and removes the first entry with an equal hash whose referent is also
//!   gone. That may be another stale entry than the one reported; every
//!   such entry is garbage, so which one leaves first does not matter.
//! - Each registered (key, map) pair yields exactly one notification, so
//!   notifications are never fewer than stale entries not removed
//!   explicitly. Draining them all drives the stale population to zero.
//! - Live entries never match: a caller holding a key keeps it alive.
//!
//! Constraints
//! - Identity only: keys need neither `Hash` nor `Eq`; tables hash the
//!   `KeyId`.
//! - No iteration, no persistence; absent keys and values are either
//!   unrepresentable (`get`/`put`/`remove`) or rejected with
//!   `Error::InvalidArgument` (`try_get`/`try_put`/`try_remove`).
//! - Locks are held for one shard operation. Removed values are dropped
//!   after the lock is released and the default hook runs outside every
//!   lock, so user `Drop` code may call back into the map.
//!
//! Notes and non-goals
//! - `get` with a default hook is not atomic: racing misses may each run
//!   the hook, and the last insert wins.
//! - Cancelling the background cleaner clears the map. Afterwards the map
//!   drains inline so later entries still cannot leak.
//! - `len()` counts stale entries not yet purged.

mod builder;
mod cleaner;
mod error;
mod key;
mod map;
mod shard;
mod shard_proptest;
mod shared;
mod table;
mod weak_key;

// Public surface
pub use builder::Builder;
pub use cleaner::{Cleaner, Cleanup};
pub use error::Error;
pub use key::{Key, KeyId};
pub use map::WeakConcurrentMap;
