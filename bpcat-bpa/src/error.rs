/*!
Engine-level error kinds (spec §7's error table), distinct from the
codec-local parse errors `bpcat-bpv6::Error` already covers. Storage and
CLA errors are always surfaced; the engine never silently absorbs I/O
failure except `Timeout`, which callers are expected to retry.
*/
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid argument: {0}")]
    ParmErr(String),

    #[error("malformed bundle: {0}")]
    BundleParseErr(#[from] bpcat_bpv6::Error),

    #[error("payload of {len} bytes exceeds max_bundle_length {max} and fragmentation is disallowed")]
    BundleTooLarge { len: usize, max: usize },

    #[error("bundle lifetime has elapsed")]
    Expired,

    #[error("unknown block carried DELETENOPROC; bundle dropped")]
    Dropped,

    #[error("unsupported feature: {0}")]
    Unsupported(String),

    #[error("operation attempted on the wrong channel")]
    WrongChannel,

    #[error("channel not configured for origination")]
    WrongOrigination,

    #[error("active table is full (capacity {capacity})")]
    ActiveTableFull { capacity: usize },

    #[error("custody id {0} already present in the active table")]
    DuplicateCid(u64),

    #[error("custody id {0} not found in the active table")]
    CidNotFound(u64),

    #[error("backing store error: {0}")]
    FailedStore(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("blocking operation exceeded its timeout budget")]
    Timeout,

    #[error("bundle-integrity check failed")]
    Integrity,
}

/// The outcome of [`crate::engine::receive`], mirroring spec §4.5.2's
/// result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiveOutcome {
    Delivered,
    PendingForward,
    PendingCustodyTransfer,
    PendingAcknowledgement,
    Dropped,
    Expired,
    Ignored,
}
