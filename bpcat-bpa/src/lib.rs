/*!
The bundle protocol agent: the active-transmission table, the storage
adapter contract, the bundle engine, and the channel (endpoint/socket)
surface that ties them together behind a CLA boundary.

This crate covers C3 through C6: everything downstream of a parsed or
about-to-be-serialized [`bpcat_bpv6::Bundle`]. The wire codec itself lives
in `bpcat-bpv6`; transports (CLAs) and concrete backing stores are
external collaborators that depend on this crate rather than the reverse.
*/

pub mod active_table;
pub mod channel;
pub mod cla;
pub mod config;
pub mod dacs;
pub mod engine;
pub mod error;
pub mod storage;

pub use active_table::{ActiveEntry, ActiveTable};
pub use channel::Channel;
pub use cla::Cla;
pub use config::ChannelConfig;
pub use engine::{OriginatedFragment, ReceiveEffect};
pub use error::{Error, ReceiveOutcome};
pub use storage::{MemoryStorage, StorageAdapter, StorageId, StorageParams};
