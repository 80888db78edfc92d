/*!
IPN endpoint identifiers: a `(node, service)` pair, written as
`ipn://<node>.<service>`. Service `0` means "any service on node" per spec
§3; this engine only implements the IPN scheme (no `dtn://` naming, no
dictionary compression — `dictlen` must always be `0`).
*/
use std::fmt;
use std::str::FromStr;

use bpcat_sdnv::Descriptor;
use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EidError {
    #[error("endpoint identifier must have the form ipn://<node>.<service>, got {0:?}")]
    BadFormat(String),

    #[error("endpoint identifier component is not a valid integer: {0:?}")]
    BadInteger(String),
}

/// A BPv6 IPN endpoint identifier, `(node, service)`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Eid {
    pub node: u64,
    pub service: u64,
}

impl Eid {
    pub const fn new(node: u64, service: u64) -> Self {
        Self { node, service }
    }

    /// `true` if this EID's service number is the wildcard `0`.
    pub fn is_any_service(&self) -> bool {
        self.service == 0
    }
}

impl fmt::Display for Eid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ipn://{}.{}", self.node, self.service)
    }
}

impl FromStr for Eid {
    type Err = EidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s
            .strip_prefix("ipn://")
            .ok_or_else(|| EidError::BadFormat(s.to_string()))?;
        let (node, service) = rest
            .split_once('.')
            .ok_or_else(|| EidError::BadFormat(s.to_string()))?;
        Ok(Eid {
            node: node
                .parse()
                .map_err(|_| EidError::BadInteger(node.to_string()))?,
            service: service
                .parse()
                .map_err(|_| EidError::BadInteger(service.to_string()))?,
        })
    }
}

/// The on-wire field descriptors for one EID's node/service SDNV pair,
/// recorded so the primary block can later be queried without re-parsing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EidDescriptor {
    pub node: Descriptor,
    pub service: Descriptor,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_display_and_parse() {
        let eid = Eid::new(100, 1);
        assert_eq!(eid.to_string(), "ipn://100.1");
        assert_eq!("ipn://100.1".parse::<Eid>().unwrap(), eid);
    }

    #[test]
    fn service_zero_is_any_service() {
        assert!(Eid::new(5, 0).is_any_service());
        assert!(!Eid::new(5, 1).is_any_service());
    }

    #[test]
    fn rejects_malformed_input() {
        assert!("ipn:100.1".parse::<Eid>().is_err());
        assert!("ipn://100".parse::<Eid>().is_err());
        assert!("ipn://x.1".parse::<Eid>().is_err());
    }
}
