/*!
Per-channel configuration. A channel owns exactly one local endpoint, one
active table, and one pair of storage queues, so its configuration is a
plain struct rather than the node-wide mutable table the open question in
spec §9 considered and rejected.
*/
use std::num::NonZeroUsize;
use std::sync::Arc;

use bpcat_bpv6::crc::CipherSuite;
use bpcat_bpv6::eid::Eid;

/// Configuration for one [`crate::channel::Channel`].
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    pub local_eid: Eid,

    /// Largest serialized bundle this channel will originate without
    /// fragmenting. Received bundles larger than this are still accepted;
    /// this only bounds what `send` itself produces.
    pub max_bundle_length: NonZeroUsize,

    /// Default bundle lifetime, in seconds, applied when a caller doesn't
    /// specify one explicitly.
    pub default_lifetime_secs: u64,

    /// Requests custody transfer for every bundle this channel originates.
    pub request_custody: bool,

    /// Attaches a bundle-integrity block to every bundle this channel
    /// originates, using this cipher suite.
    pub integrity: Option<CipherSuite>,

    /// Allows `send` to split an oversized payload into fragments rather
    /// than failing with `BundleTooLarge`.
    pub allow_fragmentation: bool,

    /// This channel may originate bundles via `send`. A receive-only relay
    /// channel forwards but never originates, and `send` on it fails
    /// `WrongOrigination`; conversely a bundle destined elsewhere arriving
    /// on an origination-only channel also fails `WrongOrigination`.
    pub originate: bool,

    /// Only administrative records are delivered to the application;
    /// ordinary bundles addressed here are silently ignored.
    pub proc_admin_only: bool,

    /// Capacity of the active-transmission table (spec §9's resolution:
    /// fixed at channel construction, not resized at runtime).
    pub active_table_capacity: NonZeroUsize,

    /// How often, in milliseconds, the channel's expiry sweep runs.
    pub expiry_poll_interval_ms: u64,

    /// A name for this channel's storage queues, passed through to
    /// [`crate::storage::StorageParams`].
    pub storage_name: Arc<str>,
}

impl ChannelConfig {
    pub fn new(local_eid: Eid) -> Self {
        Self {
            local_eid,
            max_bundle_length: NonZeroUsize::new(65536).unwrap(),
            default_lifetime_secs: 3600,
            request_custody: false,
            integrity: None,
            allow_fragmentation: true,
            originate: true,
            proc_admin_only: false,
            active_table_capacity: NonZeroUsize::new(256).unwrap(),
            expiry_poll_interval_ms: 250,
            storage_name: Arc::from(local_eid.to_string()),
        }
    }

    pub fn with_max_bundle_length(mut self, len: NonZeroUsize) -> Self {
        self.max_bundle_length = len;
        self
    }

    pub fn with_default_lifetime_secs(mut self, secs: u64) -> Self {
        self.default_lifetime_secs = secs;
        self
    }

    pub fn with_custody(mut self, request_custody: bool) -> Self {
        self.request_custody = request_custody;
        self
    }

    pub fn with_integrity(mut self, cipher_suite: Option<CipherSuite>) -> Self {
        self.integrity = cipher_suite;
        self
    }

    pub fn with_active_table_capacity(mut self, capacity: NonZeroUsize) -> Self {
        self.active_table_capacity = capacity;
        self
    }

    pub fn with_allow_fragmentation(mut self, allow: bool) -> Self {
        self.allow_fragmentation = allow;
        self
    }

    pub fn with_originate(mut self, originate: bool) -> Self {
        self.originate = originate;
        self
    }

    pub fn with_proc_admin_only(mut self, proc_admin_only: bool) -> Self {
        self.proc_admin_only = proc_admin_only;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_requests_neither_custody_nor_integrity() {
        let config = ChannelConfig::new(Eid::new(100, 1));
        assert!(!config.request_custody);
        assert!(config.integrity.is_none());
    }

    #[test]
    fn builder_methods_compose() {
        let config = ChannelConfig::new(Eid::new(100, 1))
            .with_custody(true)
            .with_integrity(Some(CipherSuite::CRC16_X25))
            .with_default_lifetime_secs(120);
        assert!(config.request_custody);
        assert_eq!(config.integrity, Some(CipherSuite::CRC16_X25));
        assert_eq!(config.default_lifetime_secs, 120);
    }
}
