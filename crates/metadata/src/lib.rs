//! Record store adapters for Ember.
//!
//! This crate provides:
//! - The [`RecordStore`] trait: set-if-absent-with-TTL, get,
//!   update-preserving-TTL, idempotent delete, and an expiration feed
//! - Backends: Redis (native TTL + keyspace notifications) and in-process
//!   (sweep-based TTL, for tests and small deployments)
//! - The private record value codec

mod codec;
pub mod error;
pub mod memory;
pub mod redis;
pub mod store;

pub use error::{MetadataError, MetadataResult};
pub use memory::MemoryStore;
pub use self::redis::RedisStore;
pub use store::{ExpirationFeed, RecordStore};

use ember_core::config::MetadataConfig;
use std::sync::Arc;
use std::time::Duration;

/// Create a record store from configuration.
pub async fn from_config(config: &MetadataConfig) -> MetadataResult<Arc<dyn RecordStore>> {
    match config {
        MetadataConfig::Redis {
            url,
            key_prefix,
            configure_notifications,
        } => {
            let store = RedisStore::connect(url, key_prefix, *configure_notifications).await?;
            Ok(Arc::new(store))
        }
        MetadataConfig::Memory { sweep_interval_ms } => {
            if *sweep_interval_ms == 0 {
                return Err(MetadataError::Config(
                    "metadata.sweep_interval_ms cannot be 0".to_string(),
                ));
            }
            let store = MemoryStore::new(Duration::from_millis(*sweep_interval_ms));
            Ok(Arc::new(store))
        }
    }
}
