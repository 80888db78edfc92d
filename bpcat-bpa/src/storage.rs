/*!
The storage adapter contract (spec §6): an opaque byte-blob queue the
engine enqueues serialized bundles into and dequeues them from, plus a
reference in-memory implementation for testing and the demo harness.
Concrete backing stores (on-disk, S3, a database) are external
collaborators and out of scope here — only the trait and one reference
implementation live in this crate.
*/
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Result<T> = std::result::Result<T, Error>;

/// Parameters a storage adapter is created with (spec §9's resolution of
/// the "magic service number" open question: an explicit struct instead).
#[derive(Debug, Clone)]
pub struct StorageParams {
    pub channel_name: Arc<str>,
    pub max_bytes: Option<usize>,
}

/// An opaque handle to one stored byte blob. Its format is private to the
/// adapter; the engine only ever round-trips it.
pub type StorageId = Arc<str>;

/// The byte-blob queue contract every storage backend implements.
///
/// `0` as a timeout means "try once"; implementations that can't block
/// (like the in-memory reference below) may ignore timeouts entirely.
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    /// Creates (or opens) the queue named by `params`.
    async fn create(&self, params: StorageParams) -> Result<()>;

    /// Enqueues `data`, returning its storage handle.
    async fn enqueue(&self, data: Bytes) -> Result<StorageId>;

    /// Dequeues the oldest still-queued blob, if any is ready within
    /// `timeout_ms` (`None` = block indefinitely).
    async fn dequeue(&self, timeout_ms: Option<u64>) -> Result<Option<(StorageId, Bytes)>>;

    /// Retrieves a previously enqueued blob by handle without removing it.
    async fn retrieve(&self, id: &StorageId) -> Result<Option<Bytes>>;

    /// Releases a blob, signalling its custody/delivery has completed.
    async fn relinquish(&self, id: &StorageId) -> Result<()>;

    /// Destroys the entire queue and all blobs within it.
    async fn destroy(&self) -> Result<()>;
}

struct Inner {
    next_id: u64,
    queue: VecDeque<StorageId>,
    blobs: std::collections::HashMap<StorageId, Bytes>,
}

/// An in-memory reference [`StorageAdapter`]: no persistence, suitable for
/// tests and the demo harness, mirroring the shape of the teacher's
/// in-memory bundle store (an `Arc`-shared, mutex-guarded cache keyed by a
/// generated handle).
pub struct MemoryStorage {
    inner: Mutex<Inner>,
    max_bytes: Mutex<Option<usize>>,
}

impl MemoryStorage {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(Inner {
                next_id: 0,
                queue: VecDeque::new(),
                blobs: std::collections::HashMap::new(),
            }),
            max_bytes: Mutex::new(None),
        })
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self {
            inner: Mutex::new(Inner {
                next_id: 0,
                queue: VecDeque::new(),
                blobs: std::collections::HashMap::new(),
            }),
            max_bytes: Mutex::new(None),
        }
    }
}

#[async_trait]
impl StorageAdapter for MemoryStorage {
    async fn create(&self, params: StorageParams) -> Result<()> {
        let mut inner = self.inner.lock().expect("storage mutex poisoned");
        inner.next_id = 0;
        inner.queue.clear();
        inner.blobs.clear();
        *self.max_bytes.lock().expect("storage mutex poisoned") = params.max_bytes;
        Ok(())
    }

    async fn enqueue(&self, data: Bytes) -> Result<StorageId> {
        let mut inner = self.inner.lock().expect("storage mutex poisoned");
        if let Some(max) = *self.max_bytes.lock().expect("storage mutex poisoned") {
            let used: usize = inner.blobs.values().map(|b| b.len()).sum();
            if used + data.len() > max {
                return Err("storage capacity exceeded".into());
            }
        }
        let id: StorageId = Arc::from(format!("mem-{}", inner.next_id));
        inner.next_id += 1;
        inner.blobs.insert(id.clone(), data);
        inner.queue.push_back(id.clone());
        Ok(id)
    }

    async fn dequeue(&self, _timeout_ms: Option<u64>) -> Result<Option<(StorageId, Bytes)>> {
        let mut inner = self.inner.lock().expect("storage mutex poisoned");
        let Some(id) = inner.queue.pop_front() else {
            return Ok(None);
        };
        let data = inner.blobs.get(&id).cloned().unwrap_or_default();
        Ok(Some((id, data)))
    }

    async fn retrieve(&self, id: &StorageId) -> Result<Option<Bytes>> {
        let inner = self.inner.lock().expect("storage mutex poisoned");
        Ok(inner.blobs.get(id).cloned())
    }

    async fn relinquish(&self, id: &StorageId) -> Result<()> {
        let mut inner = self.inner.lock().expect("storage mutex poisoned");
        inner.blobs.remove(id);
        inner.queue.retain(|queued| queued != id);
        Ok(())
    }

    async fn destroy(&self) -> Result<()> {
        let mut inner = self.inner.lock().expect("storage mutex poisoned");
        inner.blobs.clear();
        inner.queue.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_a_blob() {
        let storage = MemoryStorage::new();
        storage
            .create(StorageParams {
                channel_name: Arc::from("test"),
                max_bytes: None,
            })
            .await
            .unwrap();

        let id = storage.enqueue(Bytes::from_static(b"hello")).await.unwrap();
        let retrieved = storage.retrieve(&id).await.unwrap().unwrap();
        assert_eq!(retrieved, Bytes::from_static(b"hello"));
    }

    #[tokio::test]
    async fn dequeue_is_fifo() {
        let storage = MemoryStorage::new();
        let a = storage.enqueue(Bytes::from_static(b"a")).await.unwrap();
        let _b = storage.enqueue(Bytes::from_static(b"b")).await.unwrap();
        let (first, data) = storage.dequeue(Some(0)).await.unwrap().unwrap();
        assert_eq!(first, a);
        assert_eq!(data, Bytes::from_static(b"a"));
    }

    #[tokio::test]
    async fn relinquish_removes_the_blob() {
        let storage = MemoryStorage::new();
        let id = storage.enqueue(Bytes::from_static(b"x")).await.unwrap();
        storage.relinquish(&id).await.unwrap();
        assert!(storage.retrieve(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn destroy_clears_everything() {
        let storage = MemoryStorage::new();
        storage.enqueue(Bytes::from_static(b"x")).await.unwrap();
        storage.destroy().await.unwrap();
        assert!(storage.dequeue(Some(0)).await.unwrap().is_none());
    }
}
