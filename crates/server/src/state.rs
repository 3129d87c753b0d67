//! Application state shared across handlers.

use crate::lifecycle::Lifecycle;
use ember_core::config::AppConfig;
use ember_metadata::RecordStore;
use ember_storage::BlobStore;
use std::sync::Arc;

/// Shared application state.
///
/// Constructed explicitly at startup and passed down; the store handles it
/// holds are the only process-wide state.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Metadata record store.
    pub records: Arc<dyn RecordStore>,
    /// Blob store.
    pub blobs: Arc<BlobStore>,
    /// Lifecycle manager over both stores.
    pub lifecycle: Lifecycle,
}

impl AppState {
    /// Create a new application state.
    pub fn new(config: AppConfig, records: Arc<dyn RecordStore>, blobs: Arc<BlobStore>) -> Self {
        let lifecycle = Lifecycle::new(
            records.clone(),
            blobs.clone(),
            config.server.max_upload_bytes,
        );
        Self {
            config: Arc::new(config),
            records,
            blobs,
            lifecycle,
        }
    }
}
