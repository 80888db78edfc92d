/*!
The primary error type for the `bpcat-bpv6` crate, and the non-fatal flag
bitset that accumulates alongside it during a single parse.

Codec-local failures (malformed SDNVs, truncated blocks) return an `Error`
from the call that hit them; conditions that should influence the *caller's*
decision without aborting the parse outright (a non-compliant bundle that
should still be flagged, an unknown block that had to be dropped) are
recorded in a [`ParseFlags`] the caller threads through the whole parse,
mirroring the source's mixed negative-return-code-plus-flag-word convention
collapsed into a single `Result` plus a separately threaded flag set.
*/
use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    #[error(transparent)]
    Sdnv(#[from] bpcat_sdnv::Error),

    #[error("unsupported bundle protocol version {0}")]
    InvalidVersion(u64),

    /// Dictionary-based EIDs (`dictlen > 0`) are out of scope for this engine.
    #[error("dictionary-based EIDs are not supported (dictlen = {0})")]
    DictionaryUnsupported(u64),

    #[error("bundle has no payload block")]
    MissingPayload,

    #[error("bytes follow the payload block's declared length")]
    TrailingData,

    #[error("custody requested but no CTEB was attached")]
    NonCompliantCustody,

    #[error("block declares a length that exceeds the remaining buffer")]
    BlockTooShort,

    #[error("unknown block carries DELETENOPROC; bundle must be dropped")]
    DeleteNoProc,

    #[error("invalid endpoint identifier: {0}")]
    InvalidEid(#[from] crate::eid::EidError),

    #[error(transparent)]
    Crc(#[from] crate::crc::Error),

    #[error("fragment offset {offset} + length {len} exceeds total ADU length {total}")]
    InvalidFragment { offset: u64, len: u64, total: u64 },
}

/// Non-fatal conditions accumulated across a single parse (spec §7's
/// "Propagation policy"). `nonconformant` corresponds to the wire format's
/// `NONCOMPLIANT` flag, `incomplete` to `INCOMPLETE`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ParseFlags {
    pub nonconformant: bool,
    pub incomplete: bool,
}

impl ParseFlags {
    pub fn merge(&mut self, other: ParseFlags) {
        self.nonconformant |= other.nonconformant;
        self.incomplete |= other.incomplete;
    }
}
