//! State shared between a map handle and its cleaner worker.

use crate::key::{Key, MapId};
use crate::table::Table;
use crate::weak_key::WeakKey;
use core::hash::BuildHasher;
use crossbeam_channel::{Receiver, Sender};
use log::trace;

pub(crate) struct Shared<K, V, S> {
    id: MapId,
    pub(crate) table: Table<K, V, S>,
    notifier: Sender<WeakKey<K>>,
    queue: Receiver<WeakKey<K>>,
}

impl<K, V, S> Shared<K, V, S>
where
    S: BuildHasher,
{
    pub(crate) fn new(table: Table<K, V, S>) -> Self {
        let (notifier, queue) = crossbeam_channel::unbounded();
        Self {
            id: MapId::new(),
            table,
            notifier,
            queue,
        }
    }

    pub(crate) fn queue(&self) -> &Receiver<WeakKey<K>> {
        &self.queue
    }

    /// Stores `value` under a wrapper registered against this map's queue.
    pub(crate) fn insert(&self, key: &Key<K>, value: V) -> Option<V> {
        let hash = self.table.hash(key);
        let weak = key.register(&self.id, hash, &self.notifier);
        self.table.insert(weak, value)
    }

    /// Removes one stale entry matching `stale`. Returns `false` when the
    /// entry was already gone (explicit remove, clear, or an earlier
    /// notification that accounted for it).
    pub(crate) fn expunge(&self, stale: &WeakKey<K>) -> bool {
        let removed = self.table.expunge(stale);
        let purged = removed.is_some();
        drop(removed);
        trace!("expunged stale entry {:#018x}: {}", stale.hash(), purged);
        purged
    }

    /// Drains every pending notification without blocking.
    pub(crate) fn expunge_pending(&self) -> usize {
        let mut purged = 0;
        while let Ok(stale) = self.queue.try_recv() {
            if self.expunge(&stale) {
                purged += 1;
            }
        }
        purged
    }
}
