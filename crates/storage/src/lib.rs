//! Blob storage for Ember.
//!
//! This crate provides the filesystem-backed byte store: one file per
//! record name under a configured root, with atomic writes and streaming
//! reads. Blobs are addressed by [`ember_core::FileName`] only, so the
//! safe-name grammar is enforced before any path is formed.

pub mod error;
pub mod filesystem;

pub use error::{StorageError, StorageResult};
pub use filesystem::{BlobStore, ByteStream};

use ember_core::config::StorageConfig;

/// Create a blob store from configuration.
pub async fn from_config(config: &StorageConfig) -> StorageResult<BlobStore> {
    BlobStore::new(&config.root).await
}
