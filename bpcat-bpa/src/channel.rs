/*!
The endpoint (socket) surface (C6): `create → bind → connect → send → recv
→ close`, layered on the bundle engine (C5). A [`Channel`] owns the one
active table, the bundle-store and payload-store handles, and the locking
discipline from spec §5 — two locks per channel plus a finer active-table
lock, with lock ordering bundle-store-before-active-table and
payload-store never taken while holding bundle-store.

A channel also implements [`Cla`], so a transport-specific CLA can drive it
directly via `cla_ingress`/`cla_egress` without depending on anything else
in this crate.
*/
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use bpcat_async::TaskPool;
use bytes::Bytes;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

use bpcat_bpv6::dtn_time::DtnTime;
use bpcat_bpv6::eid::Eid;

use crate::active_table::{ActiveEntry, ActiveTable};
use crate::cla::{self, Cla};
use crate::config::ChannelConfig;
use crate::dacs::decode_dacs;
use crate::engine::{self, ReceiveEffect};
use crate::error::{Error, ReceiveOutcome};
use crate::storage::StorageAdapter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum SocketState {
    #[default]
    Created,
    Bound,
    Connected(Eid),
}

/// A zero lifetime means "never expires" (spec §4.5.1/§4.5.2), so it must
/// not collapse to `now` via `saturating_add_secs(0)`.
fn retransmit_deadline(now: DtnTime, lifetime_secs: u64) -> DtnTime {
    if lifetime_secs == 0 {
        DtnTime::new(u64::MAX)
    } else {
        now.saturating_add_secs(lifetime_secs)
    }
}

fn map_active_table_error(err: crate::active_table::Error) -> Error {
    match err {
        crate::active_table::Error::Full { capacity } => Error::ActiveTableFull { capacity },
        crate::active_table::Error::Duplicate(cid) => Error::DuplicateCid(cid),
        crate::active_table::Error::NotFound(cid) => Error::CidNotFound(cid),
    }
}

/// One bound local endpoint: its configuration, storage queues, and active
/// table, and the operations a CLA or application drives it with.
pub struct Channel {
    config: ChannelConfig,
    bundle_store: Arc<dyn StorageAdapter>,
    payload_store: Arc<dyn StorageAdapter>,
    active_table: Mutex<ActiveTable>,
    bundle_lock: Mutex<()>,
    payload_lock: Mutex<()>,
    state: Mutex<SocketState>,
    next_cid: AtomicU64,
    next_seqno: AtomicU64,
    task_pool: TaskPool,
}

impl Channel {
    pub fn new(
        config: ChannelConfig,
        bundle_store: Arc<dyn StorageAdapter>,
        payload_store: Arc<dyn StorageAdapter>,
    ) -> Self {
        let capacity = config.active_table_capacity.get();
        Self {
            config,
            bundle_store,
            payload_store,
            active_table: Mutex::new(ActiveTable::new(capacity)),
            bundle_lock: Mutex::new(()),
            payload_lock: Mutex::new(()),
            state: Mutex::new(SocketState::Created),
            next_cid: AtomicU64::new(0),
            next_seqno: AtomicU64::new(0),
            task_pool: TaskPool::new(),
        }
    }

    /// Starts the background maintenance worker that runs
    /// [`Self::sweep_expired`] every `expiry_poll_interval_ms` until
    /// [`Self::close`] shuts the channel's task pool down.
    pub fn spawn_maintenance(self: &Arc<Self>) {
        let channel = Arc::clone(self);
        let cancel = channel.task_pool.child_token();
        let interval = std::time::Duration::from_millis(channel.config.expiry_poll_interval_ms);
        channel.task_pool.spawn(async move {
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {}
                    _ = cancel.cancelled() => break,
                }
                if let Err(err) = channel.sweep_expired(DtnTime::now()).await {
                    warn!(%err, "expiry sweep failed");
                }
            }
        });
    }

    /// Binds the channel to its configured local endpoint, initializing
    /// both storage queues. Fails if the channel is already bound.
    pub async fn bind(&self) -> Result<(), Error> {
        let mut state = self.state.lock().await;
        if *state != SocketState::Created {
            return Err(Error::ParmErr("channel is already bound".into()));
        }

        let params = crate::storage::StorageParams {
            channel_name: self.config.storage_name.clone(),
            max_bytes: None,
        };
        self.bundle_store
            .create(params.clone())
            .await
            .map_err(Error::FailedStore)?;
        self.payload_store.create(params).await.map_err(Error::FailedStore)?;

        *state = SocketState::Bound;
        Ok(())
    }

    /// Sets the remote endpoint `send` will address. Must follow `bind`.
    pub async fn connect(&self, remote: Eid) -> Result<(), Error> {
        let mut state = self.state.lock().await;
        if *state == SocketState::Created {
            return Err(Error::ParmErr("channel must be bound before connecting".into()));
        }
        *state = SocketState::Connected(remote);
        Ok(())
    }

    /// Stops the maintenance worker (if running), then tears the channel
    /// down, destroying both storage queues.
    pub async fn close(&self) -> Result<(), Error> {
        self.task_pool.shutdown().await;
        *self.state.lock().await = SocketState::Created;
        self.bundle_store.destroy().await.map_err(Error::FailedStore)?;
        self.payload_store.destroy().await.map_err(Error::FailedStore)?;
        Ok(())
    }

    /// Originates `payload` to the connected remote endpoint, fragmenting
    /// if needed (spec §4.5.1).
    #[instrument(skip_all, fields(local = %self.config.local_eid))]
    pub async fn send(&self, payload: &[u8]) -> Result<(), Error> {
        let remote = match *self.state.lock().await {
            SocketState::Connected(remote) => remote,
            _ => return Err(Error::ParmErr("channel is not connected".into())),
        };

        let seqno = self.next_seqno.fetch_add(1, Ordering::Relaxed);
        let creation_timestamp = bpcat_bpv6::CreationTimestamp::new(DtnTime::now(), seqno);

        let fragments = engine::originate(&self.config, remote, payload, creation_timestamp, || {
            self.next_cid.fetch_add(1, Ordering::Relaxed)
        })?;

        let _bundle_guard = self.bundle_lock.lock().await;
        for fragment in &fragments {
            let storage_id = self
                .bundle_store
                .enqueue(Bytes::from(fragment.bytes.clone()))
                .await
                .map_err(Error::FailedStore)?;

            if let Some(cteb) = &fragment.bundle.cteb {
                let deadline = retransmit_deadline(DtnTime::now(), self.config.default_lifetime_secs);
                self.active_table
                    .lock()
                    .await
                    .insert(
                        ActiveEntry {
                            cid: cteb.cid,
                            storage_id,
                            retransmit_deadline: deadline,
                        },
                        false,
                    )
                    .map_err(map_active_table_error)?;
            }
        }

        debug!(fragments = fragments.len(), "originated bundle");
        Ok(())
    }

    /// Pulls the next delivered application payload, if any is ready
    /// within `timeout_ms`.
    pub async fn recv(&self, timeout_ms: Option<u64>) -> Result<Option<Vec<u8>>, Error> {
        let _guard = self.payload_lock.lock().await;
        let dequeued = self
            .payload_store
            .dequeue(timeout_ms)
            .await
            .map_err(Error::FailedStore)?;
        Ok(dequeued.map(|(_, bytes)| bytes.to_vec()))
    }

    /// Parses and dispatches one inbound wire bundle (spec §4.5.2/§4.5.3):
    /// delivers, forwards, or consumes it as a custody signal, updating the
    /// bundle/payload stores and the active table as each case requires.
    #[instrument(skip_all, fields(local = %self.config.local_eid))]
    pub async fn handle_inbound(&self, wire: &[u8], now: DtnTime) -> Result<ReceiveOutcome, Error> {
        let (outcome, effect) = engine::receive(&self.config, wire, now)?;

        match effect {
            Some(ReceiveEffect::Payload(data)) => {
                let _guard = self.payload_lock.lock().await;
                self.payload_store
                    .enqueue(Bytes::from(data))
                    .await
                    .map_err(Error::FailedStore)?;
            }
            Some(ReceiveEffect::DeliveredWithCustody {
                data,
                descriptors,
                mut bytes,
                ..
            }) => {
                let _payload_guard = self.payload_lock.lock().await;
                self.payload_store
                    .enqueue(Bytes::from(data))
                    .await
                    .map_err(Error::FailedStore)?;
                drop(_payload_guard);

                self.accept_custody(&mut bytes, descriptors, now).await?;
            }
            Some(ReceiveEffect::Forward {
                mut bytes,
                descriptors,
                ..
            }) => {
                if outcome == ReceiveOutcome::PendingCustodyTransfer {
                    self.accept_custody(&mut bytes, descriptors, now).await?;
                } else {
                    let _guard = self.bundle_lock.lock().await;
                    self.bundle_store
                        .enqueue(Bytes::from(bytes))
                        .await
                        .map_err(Error::FailedStore)?;
                }
            }
            Some(ReceiveEffect::Dacs(body)) => {
                self.apply_dacs(&body).await?;
            }
            None => {}
        }

        Ok(outcome)
    }

    /// Allocates a CID for this hop, rewrites it into the CTEB's reserved
    /// slot, stores the bundle, and tracks it in the active table.
    async fn accept_custody(
        &self,
        bytes: &mut [u8],
        descriptors: bpcat_bpv6::bundle::BundleDescriptors,
        now: DtnTime,
    ) -> Result<(), Error> {
        let cid = self.next_cid.fetch_add(1, Ordering::Relaxed);
        if let Some(cteb) = descriptors.cteb {
            bpcat_sdnv::rewrite(bytes, cteb.cid, cid)
                .map_err(|e| Error::BundleParseErr(bpcat_bpv6::Error::from(e)))?;
        }

        let _bundle_guard = self.bundle_lock.lock().await;
        let storage_id = self
            .bundle_store
            .enqueue(Bytes::from(bytes.to_vec()))
            .await
            .map_err(Error::FailedStore)?;

        let deadline = retransmit_deadline(now, self.config.default_lifetime_secs);
        self.active_table
            .lock()
            .await
            .insert(
                ActiveEntry {
                    cid,
                    storage_id,
                    retransmit_deadline: deadline,
                },
                false,
            )
            .map_err(map_active_table_error)
    }

    /// Consumes an aggregate custody signal: releases every acknowledged
    /// CID from the active table and relinquishes its storage object
    /// (spec §4.5.3).
    async fn apply_dacs(&self, body: &[u8]) -> Result<(), Error> {
        let ranges = decode_dacs(body).map_err(|e| Error::BundleParseErr(bpcat_bpv6::Error::from(e)))?;
        for range in ranges {
            for cid in range.iter() {
                let entry = self.active_table.lock().await.remove(cid);
                match entry {
                    Some(entry) => {
                        self.bundle_store
                            .relinquish(&entry.storage_id)
                            .await
                            .map_err(Error::FailedStore)?;
                    }
                    None => warn!(cid, "DACS referenced an unknown custody id"),
                }
            }
        }
        Ok(())
    }

    /// Compares `now` against every outstanding custody entry's
    /// retransmit deadline, relinquishing and untracking those that have
    /// elapsed (spec §4.5.4's maintenance sweep).
    pub async fn sweep_expired(&self, now: DtnTime) -> Result<usize, Error> {
        let expired_cids: Vec<u64> = {
            let active_table = self.active_table.lock().await;
            active_table
                .iter()
                .take_while(|entry| entry.retransmit_deadline <= now)
                .map(|entry| entry.cid)
                .collect()
        };

        let mut swept = 0;
        for cid in expired_cids {
            let entry = self.active_table.lock().await.remove(cid);
            if let Some(entry) = entry {
                self.bundle_store
                    .relinquish(&entry.storage_id)
                    .await
                    .map_err(Error::FailedStore)?;
                swept += 1;
            }
        }
        Ok(swept)
    }
}

#[async_trait]
impl Cla for Channel {
    async fn cla_ingress(&self, data: Bytes) -> cla::Result<()> {
        self.handle_inbound(&data, DtnTime::now())
            .await
            .map(|_| ())
            .map_err(|e| Box::new(e) as cla::Error)
    }

    async fn cla_egress(&self, timeout_ms: Option<u64>) -> cla::Result<Option<Bytes>> {
        let _guard = self.bundle_lock.lock().await;
        self.bundle_store
            .dequeue(timeout_ms)
            .await
            .map(|found| found.map(|(_, bytes)| bytes))
    }
}
