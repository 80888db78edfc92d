/*!
The payload block: always the last block in a bundle, terminating parsing.
Any bytes following its declared length are a malformed bundle (spec §3's
"Bundle record" ordering rule).
*/
use bpcat_sdnv::{Descriptor, decode_at, encode_padded, rewrite};

use crate::block_flags::BlockFlags;
use crate::error::Error;

pub const BLOCK_TYPE: u8 = 0x01;

const BLOCK_TYPE_WIDTH: usize = 1;
const FLAGS_WIDTH: usize = 1;
const BLKLEN_WIDTH: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadBlock {
    pub flags: BlockFlags,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PayloadBlockDescriptors {
    pub block_length: Descriptor,
}

impl PayloadBlock {
    pub fn write(&self) -> Result<(Vec<u8>, PayloadBlockDescriptors), Error> {
        let mut buf = Vec::new();
        buf.push(BLOCK_TYPE);
        let _ = BLOCK_TYPE_WIDTH;
        buf.extend(encode_padded(self.flags.into(), FLAGS_WIDTH)?);

        let blklen_offset = buf.len();
        buf.extend(encode_padded(0, BLKLEN_WIDTH)?);
        let block_length = Descriptor::new(blklen_offset, BLKLEN_WIDTH);

        buf.extend_from_slice(&self.data);

        rewrite(&mut buf, block_length, self.data.len() as u64)?;

        Ok((buf, PayloadBlockDescriptors { block_length }))
    }

    /// Rewrites just the length-prefix and data of an already-serialized
    /// payload block in place (used when a fragment's bytes change but the
    /// surrounding header layout does not).
    pub fn rewrite_length(buf: &mut [u8], descriptor: Descriptor, new_len: u64) -> Result<(), Error> {
        rewrite(buf, descriptor, new_len).map_err(Error::from)
    }

    pub fn read(buf: &[u8]) -> Result<(Self, usize, PayloadBlockDescriptors), Error> {
        let block_type = *buf.first().ok_or(bpcat_sdnv::Error::Incomplete(1))?;
        if block_type != BLOCK_TYPE {
            return Err(Error::BlockTooShort);
        }
        let mut offset = 1;

        let (flags_value, _) = decode_at(buf, offset)?;
        offset += FLAGS_WIDTH;
        let flags = BlockFlags::from(flags_value);

        let (len_value, block_length) = decode_at(buf, offset)?;
        offset += BLKLEN_WIDTH;

        let data_end = offset + len_value as usize;
        let data = buf.get(offset..data_end).ok_or(Error::BlockTooShort)?.to_vec();

        Ok((
            PayloadBlock { flags, data },
            data_end,
            PayloadBlockDescriptors { block_length },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let original = PayloadBlock {
            flags: BlockFlags {
                last_block: true,
                ..Default::default()
            },
            data: b"hello".to_vec(),
        };
        let (buf, _) = original.write().unwrap();
        let (parsed, consumed, _) = PayloadBlock::read(&buf).unwrap();
        assert_eq!(consumed, buf.len());
        assert_eq!(parsed, original);
    }

    #[test]
    fn trailing_bytes_are_not_consumed_by_read() {
        let original = PayloadBlock {
            flags: BlockFlags::default(),
            data: b"hi".to_vec(),
        };
        let (mut buf, _) = original.write().unwrap();
        buf.push(0xff);
        let (_, consumed, _) = PayloadBlock::read(&buf).unwrap();
        assert_eq!(consumed, buf.len() - 1);
    }

    #[test]
    fn rewriting_length_after_fragmenting_shrinks_declared_size() {
        let original = PayloadBlock {
            flags: BlockFlags::default(),
            data: b"0123456789".to_vec(),
        };
        let (mut buf, descriptors) = original.write().unwrap();
        PayloadBlock::rewrite_length(&mut buf, descriptors.block_length, 5).unwrap();
        let (value, _) = decode_at(&buf, descriptors.block_length.offset).unwrap();
        assert_eq!(value, 5);
    }
}
