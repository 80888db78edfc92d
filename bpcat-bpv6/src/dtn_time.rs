/*!
DTN time: milliseconds since an implementation-defined epoch, monotonic and
wall-clock-independent for expiry comparisons (spec's GLOSSARY entry for
"DTN time"). We reuse the conventional DTN epoch of 2000-01-01 00:00:00 UTC.
*/
const DTN_EPOCH: time::OffsetDateTime = time::macros::datetime!(2000-01-01 00:00:00 UTC);

#[derive(Debug, Default, Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct DtnTime(u64);

impl DtnTime {
    pub fn now() -> Self {
        Self(((time::OffsetDateTime::now_utc() - DTN_EPOCH).whole_milliseconds()) as u64)
    }

    pub const fn new(millisecs: u64) -> Self {
        Self(millisecs)
    }

    pub const fn millisecs(&self) -> u64 {
        self.0
    }

    pub const fn seconds(&self) -> u64 {
        self.0 / 1000
    }

    pub fn saturating_add_secs(&self, secs: u64) -> Self {
        Self(self.0.saturating_add(secs.saturating_mul(1000)))
    }
}

impl fmt::Display for DtnTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", DTN_EPOCH.saturating_add(time::Duration::milliseconds(self.0 as i64)))
    }
}

use std::fmt;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_is_after_epoch() {
        assert!(DtnTime::now().millisecs() > 0);
    }

    #[test]
    fn seconds_truncates_millis() {
        assert_eq!(DtnTime::new(1_500).seconds(), 1);
    }

    #[test]
    fn expiry_never_overflows() {
        let t = DtnTime::new(u64::MAX - 10);
        assert_eq!(t.saturating_add_secs(1_000_000).millisecs(), u64::MAX);
    }
}
