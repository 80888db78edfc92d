//! Runtime-agnostic async primitives shared by the bundle engine.
//!
//! The engine's concurrency model (spec §5) calls for scoped lock guards,
//! bounded queues between the CLA/application boundaries, and worker loops
//! that poll an atomic "running" flag at a bounded interval. This crate
//! collects the small set of primitives that pattern needs so the engine
//! crate doesn't reach for `tokio`/`tokio_util` directly.

pub mod cancellation_token;
pub mod notify;
pub mod spawn;
pub mod task_pool;

pub use cancellation_token::CancellationToken;
pub use notify::Notify;
pub use task_pool::TaskPool;
