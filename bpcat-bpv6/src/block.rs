/*!
A generic extension block: the representation used for any block type this
engine does not interpret (anything besides CTEB/BIB/Payload). Its
processing flags decide whether it is dropped, kept and forwarded
unmodified, or causes the whole bundle to be dropped (spec §3's "Ordering
rules during parse").
*/
use bpcat_sdnv::{Descriptor, decode_at, encode_padded, rewrite};

use crate::block_flags::BlockFlags;
use crate::error::Error;

const FLAGS_WIDTH: usize = 1;
const BLKLEN_WIDTH: usize = 4;

/// What a caller should do with an unrecognised block once its flags have
/// been inspected (spec §3.2: skip, drop-the-bundle, or forward-as-is).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnknownBlockDisposition {
    /// `DROPNOPROC` was set: exclude this block from any forwarded copy.
    Drop,
    /// `DELETENOPROC` was set: the whole bundle must be dropped.
    DeleteBundle,
    /// Neither terminal flag was set: keep the block, flagged
    /// `FORWARDNOPROC`, for inclusion in any forwarded copy.
    Forward,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownBlock {
    pub block_type: u8,
    pub flags: BlockFlags,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnknownBlockDescriptors {
    pub flags: Descriptor,
    pub block_length: Descriptor,
}

impl UnknownBlock {
    /// Inspects this block's processing flags and decides what to do with
    /// it, per spec §3.2's ordering rules.
    pub fn disposition(&self) -> UnknownBlockDisposition {
        if self.flags.delete_not_processed {
            UnknownBlockDisposition::DeleteBundle
        } else if self.flags.drop_not_processed {
            UnknownBlockDisposition::Drop
        } else {
            UnknownBlockDisposition::Forward
        }
    }

    pub fn write(&self) -> Result<(Vec<u8>, UnknownBlockDescriptors), Error> {
        let mut buf = Vec::new();
        buf.push(self.block_type);

        let flags_offset = buf.len();
        buf.extend(encode_padded(self.flags.into(), FLAGS_WIDTH)?);
        let flags = Descriptor::new(flags_offset, FLAGS_WIDTH);

        let blklen_offset = buf.len();
        buf.extend(encode_padded(0, BLKLEN_WIDTH)?);
        let block_length = Descriptor::new(blklen_offset, BLKLEN_WIDTH);

        buf.extend_from_slice(&self.data);
        rewrite(&mut buf, block_length, self.data.len() as u64)?;

        Ok((buf, UnknownBlockDescriptors { flags, block_length }))
    }

    pub fn read(buf: &[u8]) -> Result<(Self, usize, UnknownBlockDescriptors), Error> {
        let block_type = *buf.first().ok_or(bpcat_sdnv::Error::Incomplete(1))?;
        let mut offset = 1;

        let (flags_value, flags_desc) = decode_at(buf, offset)?;
        offset += FLAGS_WIDTH;
        let flags = BlockFlags::from(flags_value);

        let (len_value, block_length) = decode_at(buf, offset)?;
        offset += BLKLEN_WIDTH;

        let data_end = offset + len_value as usize;
        let data = buf.get(offset..data_end).ok_or(Error::BlockTooShort)?.to_vec();

        Ok((
            UnknownBlock { block_type, flags, data },
            data_end,
            UnknownBlockDescriptors { flags: flags_desc, block_length },
        ))
    }

    /// Sets `FORWARDNOPROC` on an already-serialized block in place, ahead
    /// of splicing it into a forwarded bundle's byte ranges.
    pub fn mark_forwarded_in_place(buf: &mut [u8], descriptors: UnknownBlockDescriptors, mut flags: BlockFlags) -> Result<(), Error> {
        flags.forwarded_not_processed = true;
        rewrite(buf, descriptors.flags, flags.into()).map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let original = UnknownBlock {
            block_type: 0xef,
            flags: BlockFlags::default(),
            data: vec![1, 2, 3],
        };
        let (buf, _) = original.write().unwrap();
        let (parsed, consumed, _) = UnknownBlock::read(&buf).unwrap();
        assert_eq!(consumed, buf.len());
        assert_eq!(parsed, original);
    }

    #[test]
    fn delete_not_processed_disposes_as_delete_bundle() {
        let block = UnknownBlock {
            block_type: 0xef,
            flags: BlockFlags {
                delete_not_processed: true,
                ..Default::default()
            },
            data: vec![],
        };
        assert_eq!(block.disposition(), UnknownBlockDisposition::DeleteBundle);
    }

    #[test]
    fn drop_not_processed_disposes_as_drop() {
        let block = UnknownBlock {
            block_type: 0xef,
            flags: BlockFlags {
                drop_not_processed: true,
                ..Default::default()
            },
            data: vec![],
        };
        assert_eq!(block.disposition(), UnknownBlockDisposition::Drop);
    }

    #[test]
    fn unflagged_block_is_forwarded() {
        let block = UnknownBlock {
            block_type: 0xef,
            flags: BlockFlags::default(),
            data: vec![],
        };
        assert_eq!(block.disposition(), UnknownBlockDisposition::Forward);
    }

    #[test]
    fn marking_forwarded_sets_the_wire_bit() {
        let original = UnknownBlock {
            block_type: 0xef,
            flags: BlockFlags::default(),
            data: vec![9],
        };
        let (mut buf, descriptors) = original.write().unwrap();
        UnknownBlock::mark_forwarded_in_place(&mut buf, descriptors, original.flags).unwrap();
        let (parsed, _, _) = UnknownBlock::read(&buf).unwrap();
        assert!(parsed.flags.forwarded_not_processed);
    }
}
