//! Core domain types and shared logic for Ember.
//!
//! This crate defines the canonical data model used across all other crates:
//! - File records and the safe-name grammar
//! - Lifespan and quota validation
//! - Application configuration

pub mod config;
pub mod error;
pub mod record;

pub use config::{AppConfig, MetadataConfig, ServerConfig, StorageConfig};
pub use error::{Error, Result};
pub use record::{FileName, FileRecord, LIFESPAN_UNLIMITED, validate_lifespan, validate_quota};
