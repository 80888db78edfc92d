/*!
The custody-transfer extension block: carries the custody ID (CID) the
active table indexes on, plus the custodian EID. Present iff the primary
block's `custody_requested` flag is set and some node along the path has
accepted custody (spec §3's CTEB description).
*/
use bpcat_sdnv::{Descriptor, decode_at, encode_padded, rewrite};

use crate::block_flags::BlockFlags;
use crate::eid::Eid;
use crate::error::Error;

pub const BLOCK_TYPE: u8 = 0x0a;

const BLOCK_TYPE_WIDTH: usize = 1;
const FLAGS_WIDTH: usize = 1;
const BLKLEN_WIDTH: usize = 1;
const CID_WIDTH: usize = 4;
const NODE_WIDTH: usize = 4;
const SERV_WIDTH: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cteb {
    pub flags: BlockFlags,
    pub cid: u64,
    pub custodian: Eid,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CtebDescriptors {
    pub block_length: Descriptor,
    pub cid: Descriptor,
}

impl Cteb {
    pub fn write(&self) -> Result<(Vec<u8>, CtebDescriptors), Error> {
        let mut buf = Vec::new();
        buf.push(BLOCK_TYPE);
        let _ = BLOCK_TYPE_WIDTH;
        buf.extend(encode_padded(self.flags.into(), FLAGS_WIDTH)?);

        let blklen_offset = buf.len();
        buf.extend(encode_padded(0, BLKLEN_WIDTH)?);
        let block_length = Descriptor::new(blklen_offset, BLKLEN_WIDTH);

        let cid_offset = buf.len();
        buf.extend(encode_padded(self.cid, CID_WIDTH)?);
        let cid = Descriptor::new(cid_offset, CID_WIDTH);

        buf.extend(encode_padded(self.custodian.node, NODE_WIDTH)?);
        buf.extend(encode_padded(self.custodian.service, SERV_WIDTH)?);

        let remainder = buf.len() - block_length.offset - block_length.width;
        rewrite(&mut buf, block_length, remainder as u64)?;

        Ok((buf, CtebDescriptors { block_length, cid }))
    }

    pub fn read(buf: &[u8]) -> Result<(Self, usize, CtebDescriptors), Error> {
        let block_type = *buf.first().ok_or(bpcat_sdnv::Error::Incomplete(1))?;
        if block_type != BLOCK_TYPE {
            return Err(Error::BlockTooShort);
        }
        let mut offset = 1;

        let (flags_value, _) = decode_at(buf, offset)?;
        offset += FLAGS_WIDTH;
        let flags = BlockFlags::from(flags_value);

        let (_blklen, block_length) = decode_at(buf, offset)?;
        offset += BLKLEN_WIDTH;

        let (cid_value, cid) = decode_at(buf, offset)?;
        offset += CID_WIDTH;

        let (node, _) = decode_at(buf, offset)?;
        offset += NODE_WIDTH;
        let (service, _) = decode_at(buf, offset)?;
        offset += SERV_WIDTH;

        Ok((
            Cteb {
                flags,
                cid: cid_value,
                custodian: Eid::new(node, service),
            },
            offset,
            CtebDescriptors { block_length, cid },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let original = Cteb {
            flags: BlockFlags::default(),
            cid: 42,
            custodian: Eid::new(100, 1),
        };
        let (buf, _) = original.write().unwrap();
        let (parsed, consumed, _) = Cteb::read(&buf).unwrap();
        assert_eq!(consumed, buf.len());
        assert_eq!(parsed, original);
    }

    #[test]
    fn cid_descriptor_allows_rewrite() {
        let original = Cteb {
            flags: BlockFlags::default(),
            cid: 1,
            custodian: Eid::new(100, 1),
        };
        let (mut buf, descriptors) = original.write().unwrap();
        rewrite(&mut buf, descriptors.cid, 99).unwrap();
        let (parsed, _, _) = Cteb::read(&buf).unwrap();
        assert_eq!(parsed.cid, 99);
    }

    #[test]
    fn rejects_wrong_block_type() {
        let mut buf = Cteb {
            flags: BlockFlags::default(),
            cid: 1,
            custodian: Eid::new(1, 1),
        }
        .write()
        .unwrap()
        .0;
        buf[0] = 0xff;
        assert!(Cteb::read(&buf).is_err());
    }
}
