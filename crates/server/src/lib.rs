//! HTTP server and lifecycle core for Ember.
//!
//! This crate provides:
//! - The lifecycle manager: create/fetch/consume with the dual-store
//!   consistency protocol
//! - The expiry reaper reclaiming blobs for time-expired records
//! - The HTTP surface translating requests onto the lifecycle manager

pub mod error;
pub mod handlers;
pub mod lifecycle;
pub mod reaper;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use lifecycle::{Lifecycle, LifecycleError};
pub use routes::create_router;
pub use state::AppState;
