//! A token for cooperative cancellation of async operations.
//!
//! Type alias over `tokio_util`'s cancellation token. Worker loops clone a
//! child token, `tokio::select!` it against their real work, and exit on
//! the `cancelled()` branch; the maintenance loop's "shutdown sets a running
//! flag, workers poll it at least once per `BPCAT_MAX_WAIT_MSEC`" contract
//! (spec §5) is built on top of this rather than a hand-rolled atomic bool.
pub type CancellationToken = tokio_util::sync::CancellationToken;
