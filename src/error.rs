use std::io;

/// Errors surfaced by [`WeakConcurrentMap`](crate::WeakConcurrentMap).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An absent key or value was passed to a checked entry point.
    #[error("invalid argument: `{0}` must be present")]
    InvalidArgument(&'static str),
    /// The background cleaner thread could not be started.
    #[error("failed to spawn cleaner thread")]
    Spawn(#[source] io::Error),
    /// The background cleaner thread panicked before it was joined.
    #[error("cleaner thread panicked")]
    CleanerPanicked,
}
