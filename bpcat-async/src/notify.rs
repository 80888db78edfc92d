//! Notification primitive for waking the maintenance loop.
//!
//! The expiry sweep (spec §4.5.4) blocks until a wake signal or a bounded
//! poll interval elapses, whichever comes first. `Notify` is what the
//! engine signals when a `send` or `receive` call changes a bundle's
//! expiry-relevant state, so the sweep doesn't have to poll any faster
//! than its configured interval to stay responsive.
use std::future::Future;

pub struct Notify(tokio::sync::Notify);

impl Notify {
    pub fn new() -> Self {
        Self(tokio::sync::Notify::new())
    }

    pub fn notify_one(&self) {
        self.0.notify_one();
    }

    pub fn notified(&self) -> impl Future<Output = ()> + '_ {
        self.0.notified()
    }
}

impl Default for Notify {
    fn default() -> Self {
        Self::new()
    }
}
