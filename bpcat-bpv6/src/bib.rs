/*!
The bundle-integrity block: a simplified BPSec-style integrity block
carrying a single security target (the payload block) and a single
security result (a checksum over the payload bytes). This is the entirety
of the "security beyond" this engine implements — no confidentiality
blocks, no multi-target results (spec's security non-goal).
*/
use bpcat_sdnv::{Descriptor, decode_at, encode_padded, rewrite};

use crate::block_flags::BlockFlags;
use crate::crc::CipherSuite;
use crate::error::Error;

pub const BLOCK_TYPE: u8 = 0x03;

const BLOCK_TYPE_WIDTH: usize = 1;
const FLAGS_WIDTH: usize = 1;
const BLKLEN_WIDTH: usize = 1;
const TARGET_COUNT_WIDTH: usize = 1;
const TARGET_TYPE_WIDTH: usize = 1;
const TARGET_SEQUENCE_WIDTH: usize = 1;
const CIPHER_SUITE_ID_WIDTH: usize = 1;
const CIPHER_SUITE_FLAGS_WIDTH: usize = 1;
const RESULT_COUNT_WIDTH: usize = 1;
const RESULT_LENGTH_WIDTH: usize = 1;

/// The block type of the security target a BIB covers. This engine only
/// ever targets the payload block.
const SECURITY_TARGET_PAYLOAD: u64 = 1;
/// The result-value type for an integrity check value (vs. a signature).
const SECURITY_RESULT_TYPE_ICV: u8 = 0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bib {
    pub flags: BlockFlags,
    pub cipher_suite: CipherSuite,
    /// The integrity check value computed over the payload bytes.
    pub result: Vec<u8>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BibDescriptors {
    pub block_length: Descriptor,
    pub result: Descriptor,
}

impl Bib {
    /// Computes a fresh BIB over `payload`, using `cipher_suite`.
    pub fn compute(payload: &[u8], cipher_suite: CipherSuite, flags: BlockFlags) -> Result<Self, Error> {
        Ok(Bib {
            flags,
            cipher_suite,
            result: cipher_suite.digest(payload)?,
        })
    }

    /// Verifies this BIB's recorded result against `payload`.
    pub fn verify(&self, payload: &[u8]) -> Result<(), Error> {
        self.cipher_suite.verify(payload, &self.result).map_err(Error::from)
    }

    pub fn write(&self) -> Result<(Vec<u8>, BibDescriptors), Error> {
        let mut buf = Vec::new();
        buf.push(BLOCK_TYPE);
        let _ = BLOCK_TYPE_WIDTH;
        buf.extend(encode_padded(self.flags.into(), FLAGS_WIDTH)?);

        let blklen_offset = buf.len();
        buf.extend(encode_padded(0, BLKLEN_WIDTH)?);
        let block_length = Descriptor::new(blklen_offset, BLKLEN_WIDTH);

        buf.extend(encode_padded(1, TARGET_COUNT_WIDTH)?);
        buf.extend(encode_padded(SECURITY_TARGET_PAYLOAD, TARGET_TYPE_WIDTH)?);
        buf.extend(encode_padded(0, TARGET_SEQUENCE_WIDTH)?);
        buf.extend(encode_padded(self.cipher_suite.into(), CIPHER_SUITE_ID_WIDTH)?);
        buf.extend(encode_padded(0, CIPHER_SUITE_FLAGS_WIDTH)?);
        buf.extend(encode_padded(1, RESULT_COUNT_WIDTH)?);
        buf.push(SECURITY_RESULT_TYPE_ICV);
        buf.extend(encode_padded(self.result.len() as u64, RESULT_LENGTH_WIDTH)?);

        let result_offset = buf.len();
        buf.extend_from_slice(&self.result);
        let result = Descriptor::new(result_offset, self.result.len());

        let remainder = buf.len() - block_length.offset - block_length.width;
        rewrite(&mut buf, block_length, remainder as u64)?;

        Ok((buf, BibDescriptors { block_length, result }))
    }

    pub fn read(buf: &[u8]) -> Result<(Self, usize, BibDescriptors), Error> {
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

        let (_target_count, _) = decode_at(buf, offset)?;
        offset += TARGET_COUNT_WIDTH;
        let (_target_type, _) = decode_at(buf, offset)?;
        offset += TARGET_TYPE_WIDTH;
        let (_target_seq, _) = decode_at(buf, offset)?;
        offset += TARGET_SEQUENCE_WIDTH;

        let (cipher_suite_value, _) = decode_at(buf, offset)?;
        offset += CIPHER_SUITE_ID_WIDTH;
        let cipher_suite = CipherSuite::from(cipher_suite_value);

        let (_cipher_flags, _) = decode_at(buf, offset)?;
        offset += CIPHER_SUITE_FLAGS_WIDTH;

        let (_result_count, _) = decode_at(buf, offset)?;
        offset += RESULT_COUNT_WIDTH;

        offset += 1; // security_result_type: a plain byte, not an SDNV

        let (result_len, _) = decode_at(buf, offset)?;
        offset += RESULT_LENGTH_WIDTH;

        let result_offset = offset;
        let result_end = result_offset + result_len as usize;
        let result_bytes = buf
            .get(result_offset..result_end)
            .ok_or(Error::BlockTooShort)?;
        let result = Descriptor::new(result_offset, result_len as usize);

        Ok((
            Bib {
                flags,
                cipher_suite,
                result: result_bytes.to_vec(),
            },
            result_end,
            BibDescriptors { block_length, result },
        ))
    }
}
