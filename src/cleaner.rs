//! Cleanup strategies and the background cleaner worker.
//!
//! A map is built with one [`Cleanup`] strategy. Only
//! [`Cleanup::Background`] owns a thread: it blocks on the map's
//! notification queue and expunges stale entries as keys are released.
//! The worker is supervised through a [`Cleaner`] handle; cancelling it
//! ends the loop and clears the whole map, because nothing is left to
//! guarantee that entries registered from then on get purged.

use crate::error::Error;
use crate::shared::Shared;
use core::hash::BuildHasher;
use core::sync::atomic::{AtomicBool, Ordering};
use crossbeam_channel::{select, Receiver, Sender};
use log::{debug, warn};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// How a map gets rid of entries whose key has been released.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum Cleanup {
    /// A dedicated worker thread purges stale entries as they are reported.
    /// If the worker stops, operations fall back to [`Cleanup::Inline`].
    #[default]
    Background,
    /// `get`, `put`, `remove` and `contains_key` first drain every pending
    /// notification on the calling thread.
    Inline,
    /// Nothing is drained implicitly; the owner calls
    /// [`expunge_stale_entries`](crate::WeakConcurrentMap::expunge_stale_entries).
    Manual,
}

/// Handle to a map's background cleaner thread.
pub struct Cleaner {
    name: String,
    cancel: Sender<()>,
    running: Arc<AtomicBool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

/// Clears the running flag when the worker exits, including by panic.
struct Running(Arc<AtomicBool>);

impl Drop for Running {
    fn drop(&mut self) {
        if thread::panicking() {
            warn!("cleaner thread panicked; falling back to inline expunction");
        }
        self.0.store(false, Ordering::Release);
    }
}

impl Cleaner {
    pub(crate) fn spawn<K, V, S>(name: String, shared: Arc<Shared<K, V, S>>) -> Result<Self, Error>
    where
        K: Send + Sync + 'static,
        V: Send + Sync + 'static,
        S: BuildHasher + Send + Sync + 'static,
    {
        let (cancel, cancelled) = crossbeam_channel::bounded(1);
        let running = Arc::new(AtomicBool::new(true));
        let flag = Running(Arc::clone(&running));
        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                let _flag = flag;
                run(&shared, &cancelled);
            })
            .map_err(Error::Spawn)?;
        debug!("started cleaner thread `{}`", name);
        Ok(Self {
            name,
            cancel,
            running,
            handle: Mutex::new(Some(handle)),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `true` until the worker loop has returned.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Asks the worker to stop. The worker clears the map on its way out.
    /// Does not wait; see [`join`](Self::join).
    pub fn cancel(&self) {
        // A full slot means a cancellation is already pending.
        let _ = self.cancel.try_send(());
    }

    /// Waits for the worker to terminate. Returns immediately if it was
    /// already joined. Joining from the worker thread itself is a no-op.
    pub fn join(&self) -> Result<(), Error> {
        let handle = {
            let mut slot = self.handle.lock();
            match slot.as_ref() {
                Some(h) if h.thread().id() == thread::current().id() => None,
                _ => slot.take(),
            }
        };
        match handle {
            Some(h) => h.join().map_err(|_| Error::CleanerPanicked),
            None => Ok(()),
        }
    }

    /// Cancels the worker and waits for it to terminate.
    pub fn shutdown(&self) -> Result<(), Error> {
        self.cancel();
        self.join()
    }
}

impl core::fmt::Debug for Cleaner {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Cleaner")
            .field("name", &self.name)
            .field("running", &self.is_running())
            .finish()
    }
}

/// The cleaner loop: blocks on the notification queue until `cancelled`
/// yields or disconnects, then clears the table.
pub(crate) fn run<K, V, S>(shared: &Shared<K, V, S>, cancelled: &Receiver<()>)
where
    S: BuildHasher,
{
    loop {
        let proceed = select! {
            recv(shared.queue()) -> stale => match stale {
                Ok(stale) => {
                    shared.expunge(&stale);
                    true
                }
                // The map holds a sender for as long as it lives.
                Err(_) => false,
            },
            // A message or a dropped handle both mean stop.
            recv(cancelled) -> _ => false,
        };
        if !proceed {
            break;
        }
    }
    let discarded = shared.table.clear();
    debug!(
        "cleaner loop stopped; cleared {} entries that could no longer be tracked",
        discarded
    );
}
