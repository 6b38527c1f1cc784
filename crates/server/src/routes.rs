//! Route configuration.

use crate::auth::trace_middleware;
use crate::handlers;
use crate::metrics::metrics_handler;
use crate::state::AppState;
use axum::Router;
use axum::middleware;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        // Health check (intentionally unauthenticated for load balancers/k8s probes)
        .route("/v1/health", get(handlers::health_check))
        // Seat availability for the registration page
        .route("/v1/registration", get(handlers::registration_status))
        // Member endpoints (trust level from upstream cookies)
        .route("/v1/register", post(handlers::register))
        .route("/v1/account/delete", post(handlers::delete_account))
        .route("/v1/aliases/add", post(handlers::add_alias))
        .route("/v1/aliases/delete", post(handlers::delete_alias))
        // Admin endpoints
        .route("/v1/admin/limit", post(handlers::update_limit));

    let mut router = Router::new().merge(api_routes);

    // SECURITY: When enabled, /metrics MUST be network-restricted to the scraper.
    if state.config.server.metrics_enabled {
        let metrics_routes = Router::new().route("/metrics", get(metrics_handler));
        router = router.merge(metrics_routes);
    }

    // Order of execution: TraceLayer -> trace id span -> Handler
    router
        .layer(middleware::from_fn(trace_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
