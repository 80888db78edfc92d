/*!
Bundle creation timestamp: a `(creation time, sequence number)` pair that
together with the source EID uniquely identifies a bundle (spec §3's
"Bundle identity"). Sequence numbers disambiguate bundles created within
the same DTN-time millisecond from the same source.
*/
use crate::dtn_time::DtnTime;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CreationTimestamp {
    pub time: DtnTime,
    pub seqno: u64,
}

impl CreationTimestamp {
    pub const fn new(time: DtnTime, seqno: u64) -> Self {
        Self { time, seqno }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orders_by_time_then_seqno() {
        let a = CreationTimestamp::new(DtnTime::new(10), 0);
        let b = CreationTimestamp::new(DtnTime::new(10), 1);
        let c = CreationTimestamp::new(DtnTime::new(11), 0);
        assert!(a < b);
        assert!(b < c);
    }
}
