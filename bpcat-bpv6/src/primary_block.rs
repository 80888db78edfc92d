/*!
The primary block: every bundle's first block, carrying addressing,
processing-control flags, the creation timestamp, lifetime, and (for
fragments) the offset/total-length pair.

Fields are written into fixed-width SDNV slots (mirroring the source
library's static `bundle_pri_blk` template) so the block length field can be
patched in place once the whole block has been serialized, without
re-encoding anything that follows it.
*/
use bpcat_sdnv::{Descriptor, decode_at, encode_padded, rewrite};

use crate::block_flags::PrimaryFlags;
use crate::creation_timestamp::CreationTimestamp;
use crate::dtn_time::DtnTime;
use crate::eid::Eid;
use crate::error::{Error, ParseFlags};

const VERSION_WIDTH: usize = 1;
const PCF_WIDTH: usize = 3;
const BLKLEN_WIDTH: usize = 1;
const EID_NODE_WIDTH: usize = 4;
const EID_SERV_WIDTH: usize = 2;
const CREATESEC_WIDTH: usize = 6;
const CREATESEQ_WIDTH: usize = 4;
const LIFETIME_WIDTH: usize = 4;
const DICTLEN_WIDTH: usize = 1;
const FRAGOFFSET_WIDTH: usize = 4;
const PAYLEN_WIDTH: usize = 4;

pub const DEFAULT_BP_VERSION: u8 = 6;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimaryBlock {
    pub version: u8,
    pub flags: PrimaryFlags,
    pub destination: Eid,
    pub source: Eid,
    pub report_to: Eid,
    pub custodian: Eid,
    pub creation_timestamp: CreationTimestamp,
    pub lifetime: u64,
    /// `Some((offset, total_adu_len))` iff `flags.is_fragment`.
    pub fragment: Option<(u64, u64)>,
}

impl Default for PrimaryBlock {
    fn default() -> Self {
        Self {
            version: DEFAULT_BP_VERSION,
            flags: PrimaryFlags::default(),
            destination: Eid::default(),
            source: Eid::default(),
            report_to: Eid::default(),
            custodian: Eid::default(),
            creation_timestamp: CreationTimestamp::new(DtnTime::now(), 0),
            lifetime: 0,
            fragment: None,
        }
    }
}

/// Offsets of the primary block's rewritable fields, recorded during
/// [`PrimaryBlock::write`]/[`PrimaryBlock::read`] so the engine can patch
/// `block_length`, `creation_timestamp`, or a fragment's offset/length
/// after the rest of the bundle has been assembled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrimaryBlockDescriptors {
    pub block_length: Descriptor,
    pub createsec: Descriptor,
    pub createseq: Descriptor,
    pub fragment_offset: Option<Descriptor>,
    pub total_adu_length: Option<Descriptor>,
}

impl PrimaryBlock {
    /// Serializes this block, returning the bytes and the descriptors of
    /// its rewritable fields.
    pub fn write(&self) -> Result<(Vec<u8>, PrimaryBlockDescriptors), Error> {
        let mut buf = Vec::new();
        buf.push(self.version);
        let _ = VERSION_WIDTH;

        let pcf: u64 = self.flags.into();
        buf.extend(encode_padded(pcf, PCF_WIDTH)?);

        let blklen_offset = buf.len();
        buf.extend(encode_padded(0, BLKLEN_WIDTH)?);
        let block_length = Descriptor::new(blklen_offset, BLKLEN_WIDTH);

        buf.extend(encode_padded(self.destination.node, EID_NODE_WIDTH)?);
        buf.extend(encode_padded(self.destination.service, EID_SERV_WIDTH)?);
        buf.extend(encode_padded(self.source.node, EID_NODE_WIDTH)?);
        buf.extend(encode_padded(self.source.service, EID_SERV_WIDTH)?);
        buf.extend(encode_padded(self.report_to.node, EID_NODE_WIDTH)?);
        buf.extend(encode_padded(self.report_to.service, EID_SERV_WIDTH)?);
        buf.extend(encode_padded(self.custodian.node, EID_NODE_WIDTH)?);
        buf.extend(encode_padded(self.custodian.service, EID_SERV_WIDTH)?);

        let createsec_offset = buf.len();
        buf.extend(encode_padded(
            self.creation_timestamp.time.seconds(),
            CREATESEC_WIDTH,
        )?);
        let createsec = Descriptor::new(createsec_offset, CREATESEC_WIDTH);

        let createseq_offset = buf.len();
        buf.extend(encode_padded(self.creation_timestamp.seqno, CREATESEQ_WIDTH)?);
        let createseq = Descriptor::new(createseq_offset, CREATESEQ_WIDTH);

        buf.extend(encode_padded(self.lifetime, LIFETIME_WIDTH)?);

        // dictlen is always 0: no dictionary-compressed EIDs (non-goal).
        buf.extend(encode_padded(0, DICTLEN_WIDTH)?);

        let (fragment_offset, total_adu_length) = if let Some((offset, total)) = self.fragment {
            let fragoffset_at = buf.len();
            buf.extend(encode_padded(offset, FRAGOFFSET_WIDTH)?);
            let paylen_at = buf.len();
            buf.extend(encode_padded(total, PAYLEN_WIDTH)?);
            (
                Some(Descriptor::new(fragoffset_at, FRAGOFFSET_WIDTH)),
                Some(Descriptor::new(paylen_at, PAYLEN_WIDTH)),
            )
        } else {
            (None, None)
        };

        let remainder = buf.len() - block_length.offset - block_length.width;
        rewrite(&mut buf, block_length, remainder as u64)?;

        Ok((
            buf,
            PrimaryBlockDescriptors {
                block_length,
                createsec,
                createseq,
                fragment_offset,
                total_adu_length,
            },
        ))
    }

    /// Parses a primary block from the start of `buf`, returning the block,
    /// the number of bytes consumed, its rewrite descriptors, and any
    /// non-fatal parse flags observed.
    pub fn read(buf: &[u8]) -> Result<(Self, usize, PrimaryBlockDescriptors, ParseFlags), Error> {
        let mut flags = ParseFlags::default();
        let mut offset = 0usize;

        let version = *buf.first().ok_or(bpcat_sdnv::Error::Incomplete(1))?;
        offset += 1;
        if version != DEFAULT_BP_VERSION {
            return Err(Error::InvalidVersion(version as u64));
        }

        let (pcf_value, _) = decode_at(buf, offset)?;
        offset += PCF_WIDTH;
        let pcf = PrimaryFlags::from(pcf_value);

        let (_blklen_value, block_length) = decode_at(buf, offset)?;
        offset += BLKLEN_WIDTH;

        let (dst_node, _) = decode_at(buf, offset)?;
        offset += EID_NODE_WIDTH;
        let (dst_serv, _) = decode_at(buf, offset)?;
        offset += EID_SERV_WIDTH;
        let (src_node, _) = decode_at(buf, offset)?;
        offset += EID_NODE_WIDTH;
        let (src_serv, _) = decode_at(buf, offset)?;
        offset += EID_SERV_WIDTH;
        let (rpt_node, _) = decode_at(buf, offset)?;
        offset += EID_NODE_WIDTH;
        let (rpt_serv, _) = decode_at(buf, offset)?;
        offset += EID_SERV_WIDTH;
        let (cst_node, _) = decode_at(buf, offset)?;
        offset += EID_NODE_WIDTH;
        let (cst_serv, _) = decode_at(buf, offset)?;
        offset += EID_SERV_WIDTH;

        let (createsec_value, createsec) = decode_at(buf, offset)?;
        offset += CREATESEC_WIDTH;
        let (createseq_value, createseq) = decode_at(buf, offset)?;
        offset += CREATESEQ_WIDTH;

        let (lifetime, _) = decode_at(buf, offset)?;
        offset += LIFETIME_WIDTH;

        let (dictlen, _) = decode_at(buf, offset)?;
        offset += DICTLEN_WIDTH;
        if dictlen != 0 {
            flags.nonconformant = true;
            return Err(Error::DictionaryUnsupported(dictlen));
        }

        let (fragment, fragment_offset, total_adu_length) = if pcf.is_fragment {
            let (frag_off, frag_desc) = decode_at(buf, offset)?;
            offset += FRAGOFFSET_WIDTH;
            let (total, total_desc) = decode_at(buf, offset)?;
            offset += PAYLEN_WIDTH;
            (Some((frag_off, total)), Some(frag_desc), Some(total_desc))
        } else {
            (None, None, None)
        };

        Ok((
            PrimaryBlock {
                version,
                flags: pcf,
                destination: Eid::new(dst_node, dst_serv),
                source: Eid::new(src_node, src_serv),
                report_to: Eid::new(rpt_node, rpt_serv),
                custodian: Eid::new(cst_node, cst_serv),
                creation_timestamp: CreationTimestamp::new(
                    DtnTime::new(createsec_value * 1000),
                    createseq_value,
                ),
                lifetime,
                fragment,
            },
            offset,
            PrimaryBlockDescriptors {
                block_length,
                createsec,
                createseq,
                fragment_offset,
                total_adu_length,
            },
            flags,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PrimaryBlock {
        PrimaryBlock {
            version: DEFAULT_BP_VERSION,
            flags: PrimaryFlags {
                custody_requested: true,
                ..Default::default()
            },
            destination: Eid::new(101, 1),
            source: Eid::new(100, 1),
            report_to: Eid::new(100, 1),
            custodian: Eid::new(100, 1),
            creation_timestamp: CreationTimestamp::new(DtnTime::new(1_000_000_000), 7),
            lifetime: 3600,
            fragment: None,
        }
    }

    #[test]
    fn round_trips_non_fragment() {
        let original = sample();
        let (buf, write_descriptors) = original.write().unwrap();
        let (parsed, consumed, read_descriptors, flags) = PrimaryBlock::read(&buf).unwrap();
        assert_eq!(consumed, buf.len());
        assert_eq!(parsed, original);
        assert_eq!(write_descriptors.block_length, read_descriptors.block_length);
        assert!(!flags.nonconformant);
    }

    #[test]
    fn round_trips_fragment() {
        let mut original = sample();
        original.flags.is_fragment = true;
        original.fragment = Some((100, 250));
        let (buf, descriptors) = original.write().unwrap();
        assert!(descriptors.fragment_offset.is_some());
        let (parsed, _, _, _) = PrimaryBlock::read(&buf).unwrap();
        assert_eq!(parsed.fragment, Some((100, 250)));
    }

    #[test]
    fn rejects_unsupported_version() {
        let mut buf = sample().write().unwrap().0;
        buf[0] = 7;
        assert!(matches!(
            PrimaryBlock::read(&buf),
            Err(Error::InvalidVersion(7))
        ));
    }

    #[test]
    fn rejects_dictionary_eids() {
        let mut buf = sample().write().unwrap().0;
        // dictlen sits right after lifetime; flip its padding byte to a
        // nonzero single-byte SDNV.
        let dictlen_offset = buf.len() - DICTLEN_WIDTH;
        buf[dictlen_offset] = 1;
        assert!(matches!(
            PrimaryBlock::read(&buf),
            Err(Error::DictionaryUnsupported(1))
        ));
    }

    #[test]
    fn block_length_excludes_itself_and_preceding_fields() {
        let (buf, descriptors) = sample().write().unwrap();
        let (value, _) = decode_at(&buf, descriptors.block_length.offset).unwrap();
        let remainder = buf.len() - descriptors.block_length.offset - descriptors.block_length.width;
        assert_eq!(value, remainder as u64);
    }
}
