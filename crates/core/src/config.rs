//! Configuration types shared across crates.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Server configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Maximum upload size in bytes. Uploads above this are rejected before
    /// any bytes reach the blob store.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_max_upload_bytes() -> u64 {
    2 * 1024 * 1024 // 2 MiB
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

/// Blob storage configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory for stored blobs, one file per record name.
    #[serde(default = "default_storage_root")]
    pub root: PathBuf,
}

fn default_storage_root() -> PathBuf {
    PathBuf::from("./data/blobs")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_storage_root(),
        }
    }
}

/// Metadata store configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MetadataConfig {
    /// Redis-backed store with native TTL and keyspace expiry notifications.
    Redis {
        /// Connection URL (e.g., "redis://127.0.0.1:6379/0").
        #[serde(default = "default_redis_url")]
        url: String,
        /// Prefix applied to every record key. Scopes the expiry
        /// notification feed to this application's keyspace.
        #[serde(default = "default_key_prefix")]
        key_prefix: String,
        /// Attempt `CONFIG SET notify-keyspace-events Ex` at startup.
        /// Managed Redis services often forbid CONFIG; the failure is
        /// logged and the server keeps running, but time-expired blobs
        /// will not be reclaimed until notifications are enabled.
        #[serde(default = "default_configure_notifications")]
        configure_notifications: bool,
    },
    /// In-process store (recommended for testing and small single-process
    /// deployments only). Implements TTL with a periodic sweep instead of
    /// native notifications.
    Memory {
        /// Interval between expiry sweeps, in milliseconds.
        #[serde(default = "default_sweep_interval_ms")]
        sweep_interval_ms: u64,
    },
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379/0".to_string()
}

fn default_key_prefix() -> String {
    "ember:file:".to_string()
}

fn default_configure_notifications() -> bool {
    true
}

fn default_sweep_interval_ms() -> u64 {
    250
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self::Redis {
            url: default_redis_url(),
            key_prefix: default_key_prefix(),
            configure_notifications: default_configure_notifications(),
        }
    }
}

/// Complete application configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Blob storage configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Metadata store configuration.
    #[serde(default)]
    pub metadata: MetadataConfig,
}

impl AppConfig {
    /// Create a test configuration with sensible defaults.
    ///
    /// **For testing only.** Uses the in-process metadata store with a
    /// fast sweep interval.
    pub fn for_testing() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            metadata: MetadataConfig::Memory {
                sweep_interval_ms: 50,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = AppConfig::default();
        assert_eq!(config.server.bind, "127.0.0.1:8080");
        assert_eq!(config.server.max_upload_bytes, 2 * 1024 * 1024);
        match config.metadata {
            MetadataConfig::Redis { url, key_prefix, .. } => {
                assert_eq!(url, "redis://127.0.0.1:6379/0");
                assert_eq!(key_prefix, "ember:file:");
            }
            _ => panic!("expected redis metadata config by default"),
        }
    }

    #[test]
    fn deserialize_without_optional_fields() {
        let json = r#"{"metadata":{"type":"memory"}}"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();
        match config.metadata {
            MetadataConfig::Memory { sweep_interval_ms } => {
                assert_eq!(sweep_interval_ms, 250);
            }
            _ => panic!("expected memory metadata config"),
        }
    }

    #[test]
    fn redis_config_roundtrip() {
        let config = MetadataConfig::Redis {
            url: "redis://cache:6379/2".to_string(),
            key_prefix: "ember:file:".to_string(),
            configure_notifications: false,
        };
        let json = serde_json::to_string(&config).unwrap();
        let decoded: MetadataConfig = serde_json::from_str(&json).unwrap();
        match decoded {
            MetadataConfig::Redis {
                url,
                configure_notifications,
                ..
            } => {
                assert_eq!(url, "redis://cache:6379/2");
                assert!(!configure_notifications);
            }
            _ => panic!("expected redis config"),
        }
    }
}
