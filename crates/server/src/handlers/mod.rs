//! HTTP request handlers.

pub mod files;
pub mod health;

pub use files::{FileRecordResponse, download, get_info, upload};
pub use health::health_check;

use crate::error::ApiError;

/// Fallback for unknown routes.
pub async fn route_not_found() -> ApiError {
    ApiError::NotFound("no such route".to_string())
}
