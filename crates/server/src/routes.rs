//! Route configuration.

use crate::handlers;
use crate::state::AppState;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

/// Extra body allowance for multipart framing and the non-file form fields.
const UPLOAD_BODY_SLACK: usize = 64 * 1024;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    // The transport-level limit only has to be generous enough to let the
    // file field through; the exact per-upload limit is enforced by the
    // lifecycle manager before any bytes reach the blob store.
    let body_limit = state.config.server.max_upload_bytes as usize + UPLOAD_BODY_SLACK;

    Router::new()
        .route("/upload", post(handlers::upload))
        .route("/info/{name}", get(handlers::get_info))
        .route("/download/{name}", get(handlers::download))
        .route("/healthcheck", get(handlers::health_check))
        .fallback(handlers::route_not_found)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
