//! Health endpoint.

use crate::metrics;
use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use portal_metadata::InitOutcome;
use serde::Serialize;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// Counter store answered a ping just now.
    pub live: bool,
    /// Counter record has been ensured.
    pub ready: bool,
}

/// GET /v1/health - Health check.
///
/// Intentionally unauthenticated for load balancers and orchestrator probes.
/// Probes the counter store on every call and finishes a deferred
/// initialization once the store is reachable.
pub async fn health_check(State(state): State<AppState>) -> Response {
    let live = state.counter.probe().await;
    metrics::observe_liveness(live);

    let ready = if live && !state.counter.is_ready() {
        state.counter.initialize().await != InitOutcome::Deferred
    } else {
        live && state.counter.is_ready()
    };

    let (status_code, status) = if ready {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    (
        status_code,
        Json(HealthResponse {
            status,
            version: env!("CARGO_PKG_VERSION"),
            live,
            ready,
        }),
    )
        .into_response()
}
