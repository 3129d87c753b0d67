//! Record store trait and the expiration feed.

use crate::error::MetadataResult;
use async_trait::async_trait;
use ember_core::{FileName, FileRecord};
use tokio::sync::mpsc;

/// Feed of record names whose keys the store expired by natural TTL.
///
/// Delivery order follows the store's own expiry detection; names for
/// different records are independent. Dropping the feed tears the
/// subscription down: backends watch for the receiver closing and stop
/// their forwarding work.
pub struct ExpirationFeed {
    rx: mpsc::Receiver<String>,
}

impl ExpirationFeed {
    /// Create a feed from a channel receiver. Backends push expired names
    /// into the paired sender.
    pub(crate) fn new(rx: mpsc::Receiver<String>) -> Self {
        Self { rx }
    }

    /// Receive the next expired name, or `None` once the store side has
    /// shut down.
    pub async fn recv(&mut self) -> Option<String> {
        self.rx.recv().await
    }
}

/// Internal channel capacity for expiration feeds.
///
/// Expiry bursts beyond this apply backpressure to the forwarding task,
/// never drop notifications.
pub(crate) const FEED_CAPACITY: usize = 256;

/// Store for file records, exposing the atomic primitives the lifecycle
/// protocol is built on.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Set-if-absent with TTL attached from the record's lifespan
    /// (no TTL when the lifespan is unlimited).
    ///
    /// Returns `true` if the record was created, `false` if the key
    /// already existed. Exactly one of any set of concurrent callers for
    /// the same name observes `true`.
    async fn create(&self, record: &FileRecord) -> MetadataResult<bool>;

    /// Fetch a record. `None` covers never-existed, expired, and deleted
    /// alike.
    async fn get(&self, name: &FileName) -> MetadataResult<Option<FileRecord>>;

    /// Overwrite an existing record, preserving whatever TTL the key
    /// currently carries.
    ///
    /// Fails with [`MetadataError::NotFound`] if the key vanished (e.g.
    /// its TTL fired) between the caller's read and this write, so an
    /// expired record is never resurrected without its TTL.
    ///
    /// [`MetadataError::NotFound`]: crate::MetadataError::NotFound
    async fn update(&self, record: &FileRecord) -> MetadataResult<()>;

    /// Delete a record. Idempotent: deleting a missing key is not an
    /// error. Explicit deletes do not publish to the expiration feed.
    async fn delete(&self, name: &FileName) -> MetadataResult<()>;

    /// Subscribe to natural-TTL expirations, scoped to this store's
    /// keyspace.
    async fn subscribe_expirations(&self) -> MetadataResult<ExpirationFeed>;

    /// Check store connectivity.
    async fn health_check(&self) -> MetadataResult<()>;
}
