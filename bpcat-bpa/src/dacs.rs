/*!
Aggregate custody signal (DACS) body encoding: a sequence of CID ranges.
Per RFC 6257 an ACS "fill" is a `(count, start_cid)` SDNV pair meaning the
CIDs `[start_cid, start_cid + count)` are being acknowledged together; this
engine emits and consumes only that fill sequence (the one-byte record
type and status/reason byte the caller has already stripped off, per
[`crate::engine::ReceiveEffect::Dacs`]).
*/
use bpcat_sdnv::{Descriptor, decode_at, encode};

/// A contiguous run of acknowledged custody IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CidRange {
    pub start: u64,
    pub count: u64,
}

impl CidRange {
    pub fn iter(&self) -> impl Iterator<Item = u64> {
        self.start..(self.start + self.count)
    }
}

/// Encodes a DACS body from a sequence of CID ranges.
pub fn encode_dacs(ranges: &[CidRange]) -> Vec<u8> {
    let mut buf = Vec::new();
    for range in ranges {
        buf.extend(encode(range.count));
        buf.extend(encode(range.start));
    }
    buf
}

/// Decodes a DACS body into its CID ranges.
pub fn decode_dacs(buf: &[u8]) -> Result<Vec<CidRange>, bpcat_sdnv::Error> {
    let mut ranges = Vec::new();
    let mut offset = 0;
    while offset < buf.len() {
        let (count, Descriptor { width, .. }) = decode_at(buf, offset)?;
        offset += width;
        let (start, Descriptor { width, .. }) = decode_at(buf, offset)?;
        offset += width;
        ranges.push(CidRange { start, count });
    }
    Ok(ranges)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_single_range() {
        let ranges = vec![CidRange { start: 1, count: 3 }];
        let encoded = encode_dacs(&ranges);
        assert_eq!(decode_dacs(&encoded).unwrap(), ranges);
    }

    #[test]
    fn round_trips_multiple_ranges() {
        let ranges = vec![
            CidRange { start: 1, count: 3 },
            CidRange { start: 10, count: 1 },
        ];
        let encoded = encode_dacs(&ranges);
        assert_eq!(decode_dacs(&encoded).unwrap(), ranges);
    }

    #[test]
    fn range_iterates_its_cids() {
        let range = CidRange { start: 5, count: 3 };
        assert_eq!(range.iter().collect::<Vec<_>>(), vec![5, 6, 7]);
    }

    #[test]
    fn empty_body_decodes_to_no_ranges() {
        assert_eq!(decode_dacs(&[]).unwrap(), vec![]);
    }
}
