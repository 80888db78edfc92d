/*!
The BPv6 wire format: the block-chained binary layout a bundle is encoded
as, and the codecs that read and write it.

Block order on the wire is always Primary → (CTEB?) → (BIB?) → forwarded
unknown blocks → Payload; the payload block is terminal and any bytes
following its declared length are invalid. See [`bundle`] for the type that
ties the pieces together, and [`error::Error`] for the ways a bundle can
fail to parse.
*/

pub mod bib;
pub mod block;
pub mod block_flags;
pub mod bundle;
pub mod creation_timestamp;
pub mod crc;
pub mod cteb;
pub mod dtn_time;
pub mod eid;
pub mod error;
pub mod payload_block;
pub mod primary_block;

pub use bundle::Bundle;
pub use creation_timestamp::CreationTimestamp;
pub use dtn_time::DtnTime;
pub use eid::Eid;
pub use error::{Error, ParseFlags};
