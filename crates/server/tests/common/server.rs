//! Server test utilities.

use ember_core::config::AppConfig;
use ember_metadata::{MemoryStore, RecordStore};
use ember_server::{AppState, Lifecycle, create_router};
use ember_storage::BlobStore;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// A test server wrapper with all dependencies.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub struct TestServer {
    pub router: axum::Router,
    pub state: AppState,
    _temp_dir: TempDir,
}

#[allow(dead_code)]
impl TestServer {
    /// Create a new test server with temporary blob storage and an
    /// in-process record store sweeping every 50ms.
    pub async fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");

        let blob_root = temp_dir.path().join("blobs");
        let blobs = Arc::new(
            BlobStore::new(&blob_root)
                .await
                .expect("Failed to create blob store"),
        );

        let records: Arc<dyn RecordStore> =
            Arc::new(MemoryStore::new(Duration::from_millis(50)));

        let mut config = AppConfig::for_testing();
        config.storage.root = blob_root;

        let state = AppState::new(config, records, blobs);
        let router = create_router(state.clone());

        Self {
            router,
            state,
            _temp_dir: temp_dir,
        }
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        &self.state.lifecycle
    }

    pub fn records(&self) -> Arc<dyn RecordStore> {
        self.state.records.clone()
    }

    pub fn blobs(&self) -> Arc<BlobStore> {
        self.state.blobs.clone()
    }
}
