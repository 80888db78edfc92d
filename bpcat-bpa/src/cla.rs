/*!
The convergence-layer adapter (CLA) contract: a shim carrying
already-serialized bundles over some transport. Spec §6 names
`cla_ingress`/`cla_egress` as the two calls a CLA makes into the engine;
no concrete transport (the reference datagram-socket CLA, any
demo/test-harness wiring) is implemented here — those are external
collaborators.
*/
use async_trait::async_trait;
use bytes::Bytes;

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Result<T> = std::result::Result<T, Error>;

/// The side of the CLA↔engine boundary a CLA implementation drives.
///
/// A CLA calls `ingress` with bytes it has received from the link, and
/// polls `egress` for a bundle ready to transmit. Both are async so a CLA
/// can be built over any transport without the engine knowing about
/// sockets, datagrams, or framing.
#[async_trait]
pub trait Cla: Send + Sync {
    /// Hands a just-received, already-deframed datagram to the engine.
    async fn cla_ingress(&self, data: Bytes) -> Result<()>;

    /// Pulls the next bundle this CLA should transmit, waiting up to
    /// `timeout_ms` (`None` = block indefinitely) for one to become ready.
    async fn cla_egress(&self, timeout_ms: Option<u64>) -> Result<Option<Bytes>>;
}
