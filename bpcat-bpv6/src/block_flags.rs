/*!
Two distinct flag words live in a BPv6 bundle: the primary block's
processing-control flags ([`PrimaryFlags`], "PCF" in the spec), and the
per-extension-block processing flags every non-primary block carries
([`BlockFlags`]). Both follow the same bool-fields-plus-`unrecognised`-mask
shape so an implementation can round-trip bits it doesn't understand.
*/

/// Primary block processing-control flags (RFC 5050 §4.2's PCF field).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PrimaryFlags {
    pub is_fragment: bool,
    pub is_admin_record: bool,
    pub do_not_fragment: bool,
    pub custody_requested: bool,
    pub is_destination_singleton: bool,
    pub acknowledgement_requested: bool,
    pub unrecognised: u64,
}

const IS_FRAGMENT: u64 = 1 << 0;
const IS_ADMIN_RECORD: u64 = 1 << 1;
const DO_NOT_FRAGMENT: u64 = 1 << 2;
const CUSTODY_REQUESTED: u64 = 1 << 3;
const IS_DESTINATION_SINGLETON: u64 = 1 << 4;
const ACK_REQUESTED: u64 = 1 << 5;
const KNOWN_PRIMARY_BITS: u64 = IS_FRAGMENT
    | IS_ADMIN_RECORD
    | DO_NOT_FRAGMENT
    | CUSTODY_REQUESTED
    | IS_DESTINATION_SINGLETON
    | ACK_REQUESTED;

impl From<u64> for PrimaryFlags {
    fn from(value: u64) -> Self {
        PrimaryFlags {
            is_fragment: value & IS_FRAGMENT != 0,
            is_admin_record: value & IS_ADMIN_RECORD != 0,
            do_not_fragment: value & DO_NOT_FRAGMENT != 0,
            custody_requested: value & CUSTODY_REQUESTED != 0,
            is_destination_singleton: value & IS_DESTINATION_SINGLETON != 0,
            acknowledgement_requested: value & ACK_REQUESTED != 0,
            unrecognised: value & !KNOWN_PRIMARY_BITS,
        }
    }
}

impl From<PrimaryFlags> for u64 {
    fn from(value: PrimaryFlags) -> Self {
        let mut flags = value.unrecognised;
        if value.is_fragment {
            flags |= IS_FRAGMENT;
        }
        if value.is_admin_record {
            flags |= IS_ADMIN_RECORD;
        }
        if value.do_not_fragment {
            flags |= DO_NOT_FRAGMENT;
        }
        if value.custody_requested {
            flags |= CUSTODY_REQUESTED;
        }
        if value.is_destination_singleton {
            flags |= IS_DESTINATION_SINGLETON;
        }
        if value.acknowledgement_requested {
            flags |= ACK_REQUESTED;
        }
        flags
    }
}

/// Per-block processing flags (RFC 5050 §4.3) carried by every
/// non-primary block, including the unknown blocks this engine skips.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BlockFlags {
    pub last_block: bool,
    pub drop_not_processed: bool,
    pub forwarded_not_processed: bool,
    pub delete_not_processed: bool,
    pub notify_not_processed: bool,
    pub unrecognised: u64,
}

const LAST_BLOCK: u64 = 1 << 0;
const DROP_NOT_PROCESSED: u64 = 1 << 1;
const FORWARDED_NOT_PROCESSED: u64 = 1 << 2;
const DELETE_NOT_PROCESSED: u64 = 1 << 3;
const NOTIFY_NOT_PROCESSED: u64 = 1 << 4;
const KNOWN_BLOCK_BITS: u64 =
    LAST_BLOCK | DROP_NOT_PROCESSED | FORWARDED_NOT_PROCESSED | DELETE_NOT_PROCESSED | NOTIFY_NOT_PROCESSED;

impl From<u64> for BlockFlags {
    fn from(value: u64) -> Self {
        BlockFlags {
            last_block: value & LAST_BLOCK != 0,
            drop_not_processed: value & DROP_NOT_PROCESSED != 0,
            forwarded_not_processed: value & FORWARDED_NOT_PROCESSED != 0,
            delete_not_processed: value & DELETE_NOT_PROCESSED != 0,
            notify_not_processed: value & NOTIFY_NOT_PROCESSED != 0,
            unrecognised: value & !KNOWN_BLOCK_BITS,
        }
    }
}

impl From<BlockFlags> for u64 {
    fn from(value: BlockFlags) -> Self {
        let mut flags = value.unrecognised;
        if value.last_block {
            flags |= LAST_BLOCK;
        }
        if value.drop_not_processed {
            flags |= DROP_NOT_PROCESSED;
        }
        if value.forwarded_not_processed {
            flags |= FORWARDED_NOT_PROCESSED;
        }
        if value.delete_not_processed {
            flags |= DELETE_NOT_PROCESSED;
        }
        if value.notify_not_processed {
            flags |= NOTIFY_NOT_PROCESSED;
        }
        flags
    }
}
