//! Health check endpoint.

use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub metadata: &'static str,
}

/// GET /healthcheck: liveness probe of the metadata store connection.
///
/// Intentionally unauthenticated, for load balancers and probes. The blob
/// store is deliberately not probed here; the metadata store is the only
/// dependency that can silently go away at runtime.
pub async fn health_check(State(state): State<AppState>) -> Response {
    if state.lifecycle.health_check().await {
        (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok",
                metadata: "ok",
            }),
        )
            .into_response()
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse {
                status: "unavailable",
                metadata: "unreachable",
            }),
        )
            .into_response()
    }
}
