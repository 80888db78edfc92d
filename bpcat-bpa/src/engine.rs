/*!
The bundle engine (spec §4.5): origination with greedy fragmentation,
reception with parse/dispatch/forward, and the administrative-record path
that surfaces an aggregate custody signal for the caller to consume.

This module is deliberately storage- and lock-agnostic: it builds and
parses [`bpcat_bpv6::Bundle`] values and tells the caller what to do next
(store a fragment, forward re-encoded bytes, apply a DACS record); it never
touches a [`crate::storage::StorageAdapter`] or [`crate::active_table::ActiveTable`]
itself. [`crate::channel::Channel`] is the caller that owns those and the
locking discipline around them, matching the "C5 sits between two external
collaborators" shape.
*/
use bpcat_bpv6::bib::Bib;
use bpcat_bpv6::block_flags::{BlockFlags, PrimaryFlags};
use bpcat_bpv6::bundle::{Bundle, BundleDescriptors};
use bpcat_bpv6::creation_timestamp::CreationTimestamp;
use bpcat_bpv6::cteb::Cteb;
use bpcat_bpv6::dtn_time::DtnTime;
use bpcat_bpv6::eid::Eid;
use bpcat_bpv6::payload_block::PayloadBlock;

use crate::config::ChannelConfig;
use crate::error::{Error, ReceiveOutcome};

/// The aggregate custody signal administrative record type (RFC 6257).
const ACS_RECORD_TYPE: u8 = 0x40;

/// One fragment of an originated application data unit, ready to be
/// handed to storage by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginatedFragment {
    pub bundle: Bundle,
    pub bytes: Vec<u8>,
    pub descriptors: BundleDescriptors,
}

/// Builds the bundle (or bundles, if fragmentation is needed) for one
/// `send` call. `allocate_cid` is invoked once per fragment, in order,
/// only when `config.request_custody` is set.
///
/// Fragmentation policy is greedy: `min(max_bundle_length, remaining)`
/// per fragment, covering `[0, payload.len())` contiguously.
pub fn originate(
    config: &ChannelConfig,
    destination: Eid,
    payload: &[u8],
    creation_timestamp: CreationTimestamp,
    mut allocate_cid: impl FnMut() -> u64,
) -> Result<Vec<OriginatedFragment>, Error> {
    if !config.originate {
        return Err(Error::WrongOrigination);
    }

    let max_len = config.max_bundle_length.get();
    if payload.len() > max_len && !config.allow_fragmentation {
        return Err(Error::BundleTooLarge {
            len: payload.len(),
            max: max_len,
        });
    }

    let is_fragmented = payload.len() > max_len;
    let total_len = payload.len() as u64;

    let mut fragments = Vec::new();
    let mut offset = 0usize;
    loop {
        let remaining = payload.len() - offset;
        let chunk_len = remaining.min(max_len);
        let chunk = &payload[offset..offset + chunk_len];

        let primary = bpcat_bpv6::primary_block::PrimaryBlock {
            version: bpcat_bpv6::primary_block::DEFAULT_BP_VERSION,
            flags: PrimaryFlags {
                is_fragment: is_fragmented,
                custody_requested: config.request_custody,
                ..Default::default()
            },
            destination,
            source: config.local_eid,
            report_to: config.local_eid,
            custodian: config.local_eid,
            creation_timestamp,
            lifetime: config.default_lifetime_secs,
            fragment: is_fragmented.then_some((offset as u64, total_len)),
        };

        let cteb = config.request_custody.then(|| Cteb {
            flags: BlockFlags::default(),
            cid: allocate_cid(),
            custodian: config.local_eid,
        });

        let bib = config
            .integrity
            .map(|cipher_suite| Bib::compute(chunk, cipher_suite, BlockFlags::default()))
            .transpose()?;

        let bundle = Bundle {
            primary,
            cteb,
            bib,
            forwarded: Vec::new(),
            payload: PayloadBlock {
                flags: BlockFlags {
                    last_block: true,
                    ..Default::default()
                },
                data: chunk.to_vec(),
            },
        };

        let (bytes, descriptors) = bundle.write()?;
        fragments.push(OriginatedFragment {
            bundle,
            bytes,
            descriptors,
        });

        offset += chunk_len;
        if offset >= payload.len() {
            break;
        }
    }

    Ok(fragments)
}

/// What the caller should do after [`receive`] classifies an inbound
/// bundle, carrying whatever payload the classification needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiveEffect {
    /// Bytes ready for the application's `recv` queue; no custody tracking
    /// is needed for this bundle.
    Payload(Vec<u8>),
    /// Locally destined, custody requested: `data` goes to the application
    /// queue as above, but the caller must also allocate a CID, rewrite it
    /// into `bytes` via `descriptors.cteb`, and track the stored bundle in
    /// the active table so a custody signal can later release it.
    DeliveredWithCustody {
        data: Vec<u8>,
        bundle: Bundle,
        bytes: Vec<u8>,
        descriptors: BundleDescriptors,
    },
    /// A re-encoded bundle ready to be enqueued to the bundle store for
    /// onward transmission. `descriptors` lets the caller rewrite the
    /// CTEB's `cid` slot in `bytes` in place once it allocates a CID for
    /// this hop's custody acceptance, without re-serializing the bundle.
    Forward {
        bundle: Bundle,
        bytes: Vec<u8>,
        descriptors: BundleDescriptors,
    },
    /// The body of an aggregate custody signal record (the bytes after
    /// its one-byte record type), for the caller to decode CID ranges
    /// from and apply against the active table.
    Dacs(Vec<u8>),
}

/// Parses and classifies one inbound wire bundle (spec §4.5.2).
pub fn receive(
    config: &ChannelConfig,
    wire: &[u8],
    now: DtnTime,
) -> Result<(ReceiveOutcome, Option<ReceiveEffect>), Error> {
    let (bundle, _flags) = match Bundle::read(wire) {
        Ok(parsed) => parsed,
        Err(bpcat_bpv6::Error::DeleteNoProc) => return Ok((ReceiveOutcome::Dropped, None)),
        Err(bpcat_bpv6::Error::Crc(_)) => return Err(Error::Integrity),
        Err(e) => return Err(Error::BundleParseErr(e)),
    };

    if bundle.primary.lifetime != 0 {
        let expiry = bundle
            .primary
            .creation_timestamp
            .time
            .saturating_add_secs(bundle.primary.lifetime);
        if now >= expiry {
            return Ok((ReceiveOutcome::Expired, None));
        }
    }

    if bundle.primary.destination.node != config.local_eid.node {
        return forward(config, bundle);
    }

    if !config.local_eid.is_any_service()
        && bundle.primary.destination.service != config.local_eid.service
    {
        return Err(Error::WrongChannel);
    }

    if bundle.primary.flags.is_admin_record {
        if bundle.payload.data.len() < 2 {
            return Err(Error::Unsupported(
                "administrative record payload shorter than 2 bytes".into(),
            ));
        }
        let record_type = bundle.payload.data[0];
        return if record_type == ACS_RECORD_TYPE {
            Ok((
                ReceiveOutcome::PendingAcknowledgement,
                Some(ReceiveEffect::Dacs(bundle.payload.data[1..].to_vec())),
            ))
        } else {
            Err(Error::Unsupported(format!(
                "administrative record type {record_type:#04x}"
            )))
        };
    }

    if config.proc_admin_only {
        return Ok((ReceiveOutcome::Ignored, None));
    }

    let outcome = custody_outcome(&bundle, ReceiveOutcome::Delivered)?;
    if outcome == ReceiveOutcome::PendingCustodyTransfer {
        let data = bundle.payload.data.clone();
        let (bytes, descriptors) = bundle.write()?;
        Ok((
            outcome,
            Some(ReceiveEffect::DeliveredWithCustody {
                data,
                bundle,
                bytes,
                descriptors,
            }),
        ))
    } else {
        Ok((outcome, Some(ReceiveEffect::Payload(bundle.payload.data))))
    }
}

fn custody_outcome(bundle: &Bundle, not_requested: ReceiveOutcome) -> Result<ReceiveOutcome, Error> {
    if !bundle.primary.flags.custody_requested {
        return Ok(not_requested);
    }
    if bundle.cteb.is_none() {
        return Err(Error::Unsupported(
            "custody requested without a CTEB; only aggregate custody is supported".into(),
        ));
    }
    Ok(ReceiveOutcome::PendingCustodyTransfer)
}

fn forward(
    config: &ChannelConfig,
    mut bundle: Bundle,
) -> Result<(ReceiveOutcome, Option<ReceiveEffect>), Error> {
    if config.originate {
        return Err(Error::WrongOrigination);
    }

    if bundle.primary.flags.custody_requested {
        bundle.primary.report_to = Eid::default();
        bundle.primary.custodian = config.local_eid;
    }

    // The BIB only covers this hop's receipt; a forwarded copy is
    // re-verified (or not) independently downstream.
    bundle.bib = None;

    let outcome = custody_outcome(&bundle, ReceiveOutcome::PendingForward)?;
    let (bytes, descriptors) = bundle.write()?;
    Ok((
        outcome,
        Some(ReceiveEffect::Forward {
            bundle,
            bytes,
            descriptors,
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ChannelConfig {
        ChannelConfig::new(Eid::new(100, 1))
    }

    #[test]
    fn single_fragment_when_payload_fits() {
        let fragments = originate(
            &config(),
            Eid::new(101, 1),
            b"hello",
            CreationTimestamp::new(DtnTime::new(1_000_000), 1),
            || 0,
        )
        .unwrap();
        assert_eq!(fragments.len(), 1);
        assert!(!fragments[0].bundle.primary.flags.is_fragment);
    }

    #[test]
    fn splits_into_greedy_fragments_covering_the_payload() {
        let mut config = config();
        config.max_bundle_length = std::num::NonZeroUsize::new(100).unwrap();
        let payload = vec![0xA5u8; 250];
        let fragments = originate(
            &config,
            Eid::new(101, 1),
            &payload,
            CreationTimestamp::new(DtnTime::new(1_000_000), 1),
            || 0,
        )
        .unwrap();

        assert_eq!(fragments.len(), 3);
        let offsets: Vec<u64> = fragments
            .iter()
            .map(|f| f.bundle.primary.fragment.unwrap().0)
            .collect();
        assert_eq!(offsets, vec![0, 100, 200]);
        let sizes: Vec<usize> = fragments.iter().map(|f| f.bundle.payload.data.len()).collect();
        assert_eq!(sizes, vec![100, 100, 50]);
    }

    #[test]
    fn oversized_payload_without_fragmentation_fails() {
        let mut config = config();
        config.max_bundle_length = std::num::NonZeroUsize::new(4).unwrap();
        config.allow_fragmentation = false;
        let err = originate(
            &config,
            Eid::new(101, 1),
            b"hello",
            CreationTimestamp::new(DtnTime::new(1_000_000), 1),
            || 0,
        )
        .unwrap_err();
        assert!(matches!(err, Error::BundleTooLarge { len: 5, max: 4 }));
    }

    #[test]
    fn custody_request_attaches_a_cteb_with_the_allocated_cid() {
        let mut config = config();
        config.request_custody = true;
        let fragments = originate(
            &config,
            Eid::new(101, 1),
            b"hello",
            CreationTimestamp::new(DtnTime::new(1_000_000), 1),
            || 42,
        )
        .unwrap();
        assert_eq!(fragments[0].bundle.cteb.as_ref().unwrap().cid, 42);
    }

    fn wire_for(bundle: &Bundle) -> Vec<u8> {
        bundle.write().unwrap().0
    }

    #[test]
    fn receive_delivers_local_bundle_without_custody() {
        let config = config();
        let fragments = originate(
            &config,
            Eid::new(100, 1),
            b"hello",
            CreationTimestamp::new(DtnTime::now(), 1),
            || 0,
        )
        .unwrap();
        let (outcome, effect) = receive(&config, &fragments[0].bytes, DtnTime::now()).unwrap();
        assert_eq!(outcome, ReceiveOutcome::Delivered);
        assert_eq!(effect, Some(ReceiveEffect::Payload(b"hello".to_vec())));
    }

    #[test]
    fn receive_reports_expiry_past_lifetime() {
        let config = config();
        let mut fragments = originate(
            &config,
            Eid::new(100, 1),
            b"hello",
            CreationTimestamp::new(DtnTime::new(1_000_000), 1),
            || 0,
        )
        .unwrap();
        fragments[0].bundle.primary.lifetime = 1;
        let (bytes, _) = fragments[0].bundle.write().unwrap();
        let (outcome, effect) =
            receive(&config, &bytes, DtnTime::new(1_000_000 + 2_000)).unwrap();
        assert_eq!(outcome, ReceiveOutcome::Expired);
        assert_eq!(effect, None);
    }

    #[test]
    fn receive_forwards_bundles_for_other_nodes() {
        let origin = config();
        let fragments = originate(
            &origin,
            Eid::new(200, 1),
            b"hello",
            CreationTimestamp::new(DtnTime::now(), 1),
            || 0,
        )
        .unwrap();
        let relay = origin.clone().with_originate(false);
        let (outcome, effect) = receive(&relay, &fragments[0].bytes, DtnTime::now()).unwrap();
        assert_eq!(outcome, ReceiveOutcome::PendingForward);
        assert!(matches!(effect, Some(ReceiveEffect::Forward { .. })));
    }

    #[test]
    fn receive_rejects_wrong_service_on_a_bound_channel() {
        let config = config();
        let fragments = originate(
            &config,
            Eid::new(100, 2),
            b"hello",
            CreationTimestamp::new(DtnTime::now(), 1),
            || 0,
        )
        .unwrap();
        let err = receive(&config, &fragments[0].bytes, DtnTime::now()).unwrap_err();
        assert!(matches!(err, Error::WrongChannel));
    }

    #[test]
    fn receive_tracks_custody_for_a_locally_delivered_bundle() {
        let mut config = config();
        config.request_custody = true;
        let fragments = originate(
            &config,
            Eid::new(100, 1),
            b"hello",
            CreationTimestamp::new(DtnTime::now(), 1),
            || 7,
        )
        .unwrap();
        let (outcome, effect) = receive(&config, &fragments[0].bytes, DtnTime::now()).unwrap();
        assert_eq!(outcome, ReceiveOutcome::PendingCustodyTransfer);
        match effect {
            Some(ReceiveEffect::DeliveredWithCustody { data, bundle, .. }) => {
                assert_eq!(data, b"hello");
                assert_eq!(bundle.cteb.unwrap().cid, 7);
            }
            other => panic!("expected DeliveredWithCustody, got {other:?}"),
        }
    }

    #[test]
    fn receive_surfaces_dacs_body_for_an_acs_admin_record() {
        let mut config = config();
        config.proc_admin_only = true;
        let mut bundle = sample_admin_bundle();
        bundle.payload.data = vec![ACS_RECORD_TYPE, 0x01, 0x02, 0x03];
        let wire = wire_for(&bundle);
        let (outcome, effect) = receive(&config, &wire, DtnTime::now()).unwrap();
        assert_eq!(outcome, ReceiveOutcome::PendingAcknowledgement);
        assert_eq!(effect, Some(ReceiveEffect::Dacs(vec![0x01, 0x02, 0x03])));
    }

    fn sample_admin_bundle() -> Bundle {
        Bundle {
            primary: bpcat_bpv6::primary_block::PrimaryBlock {
                version: bpcat_bpv6::primary_block::DEFAULT_BP_VERSION,
                flags: PrimaryFlags {
                    is_admin_record: true,
                    ..Default::default()
                },
                destination: Eid::new(100, 1),
                source: Eid::new(101, 1),
                report_to: Eid::new(101, 1),
                custodian: Eid::new(101, 1),
                creation_timestamp: CreationTimestamp::new(DtnTime::now(), 1),
                lifetime: 60,
                fragment: None,
            },
            cteb: None,
            bib: None,
            forwarded: Vec::new(),
            payload: PayloadBlock {
                flags: BlockFlags {
                    last_block: true,
                    ..Default::default()
                },
                data: vec![ACS_RECORD_TYPE],
            },
        }
    }
}
