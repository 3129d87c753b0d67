//! Expiry reaper.
//!
//! Files that expire by time without ever exhausting their quota leave a
//! blob behind once the metadata store drops the record's key. The reaper
//! is the only path that reclaims those blobs: it consumes the store's
//! expiration feed for the lifetime of the process and deletes the blob
//! named by each notification.

use ember_core::FileName;
use ember_metadata::{ExpirationFeed, MetadataResult, RecordStore};
use ember_storage::{BlobStore, StorageError};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Subscribe to the store's expiration feed and spawn the reaper task.
///
/// Subscribing here rather than inside the task makes a broken
/// subscription a startup failure instead of a silent storage leak.
pub async fn spawn(
    records: &Arc<dyn RecordStore>,
    blobs: Arc<BlobStore>,
) -> MetadataResult<JoinHandle<()>> {
    let feed = records.subscribe_expirations().await?;
    Ok(tokio::spawn(run(feed, blobs)))
}

/// Drain the feed until it closes, reclaiming one blob per notification.
///
/// By the time a notification arrives the metadata record is already gone:
/// the store expired it itself, so only the blob is touched. Failures are
/// logged and never stop the loop: a missing blob just means someone else
/// (or a previous run) already reclaimed it.
pub async fn run(mut feed: ExpirationFeed, blobs: Arc<BlobStore>) {
    while let Some(name) = feed.recv().await {
        let name = match FileName::new(&name) {
            Ok(name) => name,
            Err(e) => {
                warn!(key = %name, error = %e, "expired key is not a valid file name, skipping");
                continue;
            }
        };

        match blobs.delete(&name).await {
            Ok(()) => info!(name = %name, "blob reclaimed after ttl expiry"),
            Err(StorageError::NotFound(_)) => {
                debug!(name = %name, "expired blob already gone");
            }
            Err(e) => {
                warn!(name = %name, error = %e, "failed to reclaim expired blob");
            }
        }
    }

    info!("expiration feed closed, reaper exiting");
}
