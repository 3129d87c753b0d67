//! File lifecycle management.
//!
//! The lifecycle manager owns the consistency protocol between the record
//! store and the blob store: exactly-once record creation under concurrent
//! uploads, one quota decrement per download, and exactly-once blob
//! reclamation when a record is exhausted. Time-based reclamation belongs
//! to the expiry reaper, not this module.

use bytes::Bytes;
use ember_core::{FileName, FileRecord, validate_lifespan, validate_quota};
use ember_metadata::{MetadataError, RecordStore};
use ember_storage::{BlobStore, ByteStream, StorageError};
use std::sync::Arc;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{info, warn};

/// Lifecycle operation errors.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// Client input violates a record constraint (name, lifespan, quota).
    #[error(transparent)]
    Invalid(#[from] ember_core::Error),

    #[error("file too large: {size} bytes (max {max})")]
    TooLarge { size: u64, max: u64 },

    #[error("the name already exists: {0}")]
    AlreadyExists(String),

    /// Absent, time-expired, and quota-exhausted records are all reported
    /// identically so a caller cannot probe which names ever existed.
    #[error("expired or quota exceeded: {0}")]
    NotFound(String),

    #[error("metadata store error: {0}")]
    Metadata(#[from] MetadataError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Result type for lifecycle operations.
pub type LifecycleResult<T> = std::result::Result<T, LifecycleError>;

/// Manager for the create/fetch/consume protocol over both stores.
#[derive(Clone)]
pub struct Lifecycle {
    records: Arc<dyn RecordStore>,
    blobs: Arc<BlobStore>,
    max_upload_bytes: u64,
}

impl Lifecycle {
    /// Create a new lifecycle manager.
    pub fn new(records: Arc<dyn RecordStore>, blobs: Arc<BlobStore>, max_upload_bytes: u64) -> Self {
        Self {
            records,
            blobs,
            max_upload_bytes,
        }
    }

    /// Store a new file: blob bytes plus a metadata record with the TTL
    /// attached, exactly once per name.
    ///
    /// The size limit is enforced before any bytes reach the disk. The
    /// existence pre-check shrinks, but cannot close, the window in which a
    /// lost creation race leaves the just-written blob orphaned; that waste
    /// is accepted (and logged) as the cost of avoiding a lock.
    pub async fn create(
        &self,
        name: FileName,
        original_filename: String,
        lifespan_secs: i64,
        quota: i64,
        data: Bytes,
    ) -> LifecycleResult<FileRecord> {
        validate_lifespan(lifespan_secs)?;
        validate_quota(quota)?;

        let size = data.len() as u64;
        if size > self.max_upload_bytes {
            return Err(LifecycleError::TooLarge {
                size,
                max: self.max_upload_bytes,
            });
        }

        if self.records.get(&name).await?.is_some() {
            return Err(LifecycleError::AlreadyExists(name.to_string()));
        }

        let written = self.blobs.write(&name, data).await?;
        let record = FileRecord {
            name: name.clone(),
            original_filename,
            uploaded_at: unix_now(),
            lifespan_secs,
            remaining_downloads: quota,
            size: written,
        };

        if !self.records.create(&record).await? {
            warn!(
                name = %name,
                "lost upload race for name; blob write was wasted"
            );
            return Err(LifecycleError::AlreadyExists(name.to_string()));
        }

        info!(
            name = %record.name,
            size = record.size,
            lifespan_secs = record.lifespan_secs,
            quota = record.remaining_downloads,
            "file created"
        );
        Ok(record)
    }

    /// Fetch a record without mutating it.
    pub async fn fetch(&self, name: &FileName) -> LifecycleResult<FileRecord> {
        self.records
            .get(name)
            .await?
            .ok_or_else(|| LifecycleError::NotFound(name.to_string()))
    }

    /// Consume one download: decrement the quota against the record
    /// snapshot read here, then stream the blob.
    ///
    /// On the final download the record is deleted from the metadata store
    /// first, the blob stream is opened, and the blob file itself is
    /// removed by a spawned task that never blocks the response. A record
    /// past its time limit but not yet expired by the store (TTL
    /// granularity lag) is reported `NotFound` and left for the reaper.
    ///
    /// Two concurrent consumers can both observe `remaining_downloads = 1`
    /// and both be served; that over-delivery is an accepted property of
    /// the snapshot protocol.
    pub async fn consume(&self, name: &FileName) -> LifecycleResult<(FileRecord, ByteStream)> {
        let Some(mut record) = self.records.get(name).await? else {
            return Err(LifecycleError::NotFound(name.to_string()));
        };

        if record.remaining_downloads <= 0 || record.is_expired_at(unix_now()) {
            return Err(LifecycleError::NotFound(name.to_string()));
        }

        record.remaining_downloads -= 1;

        if record.remaining_downloads > 0 {
            match self.records.update(&record).await {
                Ok(()) => {}
                // The TTL fired between our read and this write; the
                // record is gone and must not be resurrected.
                Err(MetadataError::NotFound(_)) => {
                    return Err(LifecycleError::NotFound(name.to_string()));
                }
                Err(e) => return Err(e.into()),
            }
            let stream = self.blobs.read_stream(name).await?;
            return Ok((record, stream));
        }

        // Quota exhausted: the record must disappear before the response is
        // produced, so no later request can be served from it. The open
        // file handle keeps this download alive across the unlink.
        self.records.delete(name).await?;
        let stream = self.blobs.read_stream(name).await?;

        let blobs = self.blobs.clone();
        let name = name.clone();
        tokio::spawn(async move {
            match blobs.delete(&name).await {
                Ok(()) => info!(name = %name, "blob reclaimed after quota exhaustion"),
                Err(e) => warn!(name = %name, error = %e, "failed to reclaim exhausted blob"),
            }
        });

        Ok((record, stream))
    }

    /// Liveness probe of the metadata store connection.
    pub async fn health_check(&self) -> bool {
        match self.records.health_check().await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "metadata store health check failed");
                false
            }
        }
    }
}

fn unix_now() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}
