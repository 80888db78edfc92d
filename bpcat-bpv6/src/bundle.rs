/*!
The bundle record: ties together a primary block with its optional CTEB
and BIB, any unknown blocks carried through for forwarding, and the
terminal payload block, implementing the full parse/encode pipeline and
block-ordering rules from spec §3 ("Bundle record (on-wire)").
*/
use bpcat_sdnv::Descriptor;

use crate::bib::{Bib, BibDescriptors};
use crate::block::{UnknownBlock, UnknownBlockDisposition};
use crate::crc::CipherSuite;
use crate::cteb::{Cteb, CtebDescriptors};
use crate::error::{Error, ParseFlags};
use crate::payload_block::{PayloadBlock, PayloadBlockDescriptors};
use crate::primary_block::{PrimaryBlock, PrimaryBlockDescriptors};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bundle {
    pub primary: PrimaryBlock,
    pub cteb: Option<Cteb>,
    pub bib: Option<Bib>,
    /// Blocks this node did not understand, carried through untouched (or
    /// flagged `FORWARDNOPROC`) so a forwarded copy preserves them.
    pub forwarded: Vec<UnknownBlock>,
    pub payload: PayloadBlock,
}

/// Offsets of every block's rewritable fields within the *fully encoded*
/// bundle buffer, so the engine can patch e.g. a CID or a fragment's
/// offset/length after the whole bundle has been serialized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BundleDescriptors {
    pub primary: PrimaryBlockDescriptors,
    pub cteb: Option<CtebDescriptors>,
    pub bib: Option<BibDescriptors>,
    pub payload: PayloadBlockDescriptors,
}

fn shift(descriptor: Descriptor, base: usize) -> Descriptor {
    Descriptor::new(descriptor.offset + base, descriptor.width)
}

impl Bundle {
    /// Serializes the full bundle in wire order: Primary, CTEB?, BIB?,
    /// forwarded unknown blocks, Payload.
    pub fn write(&self) -> Result<(Vec<u8>, BundleDescriptors), Error> {
        let mut buf = Vec::new();

        let (primary_bytes, primary_descriptors) = self.primary.write()?;
        buf.extend_from_slice(&primary_bytes);

        let cteb = if let Some(cteb) = &self.cteb {
            let base = buf.len();
            let (bytes, descriptors) = cteb.write()?;
            buf.extend_from_slice(&bytes);
            Some(CtebDescriptors {
                block_length: shift(descriptors.block_length, base),
                cid: shift(descriptors.cid, base),
            })
        } else {
            None
        };

        let bib = if let Some(bib) = &self.bib {
            let base = buf.len();
            let (bytes, descriptors) = bib.write()?;
            buf.extend_from_slice(&bytes);
            Some(BibDescriptors {
                block_length: shift(descriptors.block_length, base),
                result: shift(descriptors.result, base),
            })
        } else {
            None
        };

        for block in &self.forwarded {
            let (bytes, _) = block.write()?;
            buf.extend_from_slice(&bytes);
        }

        let payload_base = buf.len();
        let (payload_bytes, payload_descriptors) = self.payload.write()?;
        buf.extend_from_slice(&payload_bytes);
        let payload = PayloadBlockDescriptors {
            block_length: shift(payload_descriptors.block_length, payload_base),
        };

        Ok((
            buf,
            BundleDescriptors {
                primary: primary_descriptors,
                cteb,
                bib,
                payload,
            },
        ))
    }

    /// Parses a full bundle, enforcing block ordering and the
    /// custody/CTEB compliance rule, and verifying any BIB present.
    pub fn read(buf: &[u8]) -> Result<(Self, ParseFlags), Error> {
        let (primary, mut offset, _, mut flags) = PrimaryBlock::read(buf)?;

        let mut cteb = None;
        let mut bib = None;
        let mut forwarded = Vec::new();
        let mut payload = None;

        while offset < buf.len() {
            let block_type = buf[offset];
            if block_type == crate::payload_block::BLOCK_TYPE {
                let (block, consumed, _) = PayloadBlock::read(&buf[offset..])?;
                offset += consumed;
                payload = Some(block);
                break;
            } else if block_type == crate::cteb::BLOCK_TYPE {
                let (block, consumed, _) = Cteb::read(&buf[offset..])?;
                offset += consumed;
                cteb = Some(block);
            } else if block_type == crate::bib::BLOCK_TYPE {
                let (block, consumed, _) = Bib::read(&buf[offset..])?;
                offset += consumed;
                bib = Some(block);
            } else {
                let (mut block, consumed, _) = UnknownBlock::read(&buf[offset..])?;
                offset += consumed;
                match block.disposition() {
                    UnknownBlockDisposition::DeleteBundle => {
                        flags.incomplete = true;
                        return Err(Error::DeleteNoProc);
                    }
                    UnknownBlockDisposition::Drop => {}
                    UnknownBlockDisposition::Forward => {
                        block.flags.forwarded_not_processed = true;
                        forwarded.push(block);
                    }
                }
            }
        }

        let payload = payload.ok_or(Error::MissingPayload)?;
        if offset != buf.len() {
            return Err(Error::TrailingData);
        }

        if primary.flags.custody_requested && !primary.flags.is_admin_record && cteb.is_none() {
            flags.nonconformant = true;
            return Err(Error::NonCompliantCustody);
        }

        if let Some(bib) = &bib {
            bib.verify(&payload.data)?;
        }

        Ok((
            Bundle {
                primary,
                cteb,
                bib,
                forwarded,
                payload,
            },
            flags,
        ))
    }

    /// Recomputes this bundle's BIB (if any) over its current payload
    /// bytes, e.g. after fragmenting. No-op if no BIB is carried.
    pub fn refresh_integrity(&mut self, cipher_suite: CipherSuite) -> Result<(), Error> {
        if let Some(bib) = &mut self.bib {
            let flags = bib.flags;
            *bib = Bib::compute(&self.payload.data, cipher_suite, flags)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block_flags::{BlockFlags, PrimaryFlags};
    use crate::creation_timestamp::CreationTimestamp;
    use crate::dtn_time::DtnTime;
    use crate::eid::Eid;

    fn sample_bundle(custody: bool, integrity: bool) -> Bundle {
        let payload = PayloadBlock {
            flags: BlockFlags {
                last_block: true,
                ..Default::default()
            },
            data: b"hello".to_vec(),
        };
        Bundle {
            primary: PrimaryBlock {
                flags: PrimaryFlags {
                    custody_requested: custody,
                    ..Default::default()
                },
                destination: Eid::new(101, 1),
                source: Eid::new(100, 1),
                report_to: Eid::new(100, 1),
                custodian: Eid::new(100, 1),
                creation_timestamp: CreationTimestamp::new(DtnTime::new(1_000_000_000), 1),
                lifetime: 60,
                ..Default::default()
            },
            cteb: custody.then(|| Cteb {
                flags: BlockFlags::default(),
                cid: 1,
                custodian: Eid::new(100, 1),
            }),
            bib: integrity
                .then(|| Bib::compute(b"hello", CipherSuite::CRC16_X25, BlockFlags::default()).unwrap()),
            forwarded: Vec::new(),
            payload,
        }
    }

    #[test]
    fn round_trips_minimal_bundle() {
        let bundle = sample_bundle(false, false);
        let (buf, _) = bundle.write().unwrap();
        let (parsed, flags) = Bundle::read(&buf).unwrap();
        assert_eq!(parsed, bundle);
        assert!(!flags.nonconformant);
    }

    #[test]
    fn round_trips_with_custody_and_integrity() {
        let bundle = sample_bundle(true, true);
        let (buf, _) = bundle.write().unwrap();
        let (parsed, _) = Bundle::read(&buf).unwrap();
        assert_eq!(parsed, bundle);
    }

    #[test]
    fn custody_without_cteb_is_noncompliant() {
        let mut bundle = sample_bundle(true, false);
        bundle.cteb = None;
        let (buf, _) = bundle.write().unwrap();
        assert_eq!(Bundle::read(&buf), Err(Error::NonCompliantCustody));
    }

    #[test]
    fn trailing_bytes_after_payload_are_rejected() {
        let bundle = sample_bundle(false, false);
        let (mut buf, _) = bundle.write().unwrap();
        buf.push(0x00);
        assert_eq!(Bundle::read(&buf), Err(Error::TrailingData));
    }

    #[test]
    fn tampered_payload_fails_bib_verification() {
        let mut bundle = sample_bundle(false, true);
        bundle.payload.data = b"howdy".to_vec();
        // Recompute the block's own length byte without touching the BIB
        // result, so the corruption surfaces as a verification failure.
        let (buf, _) = bundle.write().unwrap();
        assert!(matches!(Bundle::read(&buf), Err(Error::Crc(_))));
    }

    #[test]
    fn unknown_block_with_delete_not_processed_drops_the_bundle() {
        let mut bundle = sample_bundle(false, false);
        bundle.forwarded.push(UnknownBlock {
            block_type: 0xef,
            flags: BlockFlags {
                delete_not_processed: true,
                ..Default::default()
            },
            data: vec![],
        });
        let (buf, _) = bundle.write().unwrap();
        assert_eq!(Bundle::read(&buf), Err(Error::DeleteNoProc));
    }

    #[test]
    fn unknown_block_without_terminal_flags_is_kept_and_marked_forwarded() {
        let mut bundle = sample_bundle(false, false);
        bundle.forwarded.push(UnknownBlock {
            block_type: 0xef,
            flags: BlockFlags::default(),
            data: vec![7],
        });
        let (buf, _) = bundle.write().unwrap();
        let (parsed, _) = Bundle::read(&buf).unwrap();
        assert_eq!(parsed.forwarded.len(), 1);
        assert!(parsed.forwarded[0].flags.forwarded_not_processed);
    }

    #[test]
    fn unknown_block_with_drop_not_processed_is_excluded() {
        let mut bundle = sample_bundle(false, false);
        bundle.forwarded.push(UnknownBlock {
            block_type: 0xef,
            flags: BlockFlags {
                drop_not_processed: true,
                ..Default::default()
            },
            data: vec![7],
        });
        let (buf, _) = bundle.write().unwrap();
        let (parsed, _) = Bundle::read(&buf).unwrap();
        assert!(parsed.forwarded.is_empty());
    }
}
