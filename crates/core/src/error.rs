//! Error types for the core domain.

use thiserror::Error;

/// Core domain error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid file name: {0}")]
    InvalidName(String),

    #[error("invalid lifespan: {0} (must be -1 or >= 1)")]
    InvalidLifespan(i64),

    #[error("invalid download quota: {0} (must be >= 1)")]
    InvalidQuota(i64),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
