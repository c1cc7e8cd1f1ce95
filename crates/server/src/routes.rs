//! Route configuration.

use crate::handlers;
use crate::metrics::metrics_handler;
use crate::state::AppState;
use axum::Router;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        // Upload handler
        .route("/celeb", post(handlers::upload_image))
        // Push delivery of notification batches
        .route("/v1/notifications", post(handlers::receive_notifications))
        // Read endpoints
        .route("/v1/identities", get(handlers::list_identities))
        .route("/v1/identities/{identity_id}", get(handlers::get_identity))
        .route("/v1/uploads/{upload_id}", get(handlers::get_upload))
        .route("/v1/health", get(handlers::health_check));

    let mut router = Router::new().merge(api_routes);

    // The metrics endpoint is unauthenticated; restrict it at the network level.
    if state.config.server.metrics_enabled {
        router = router.route("/metrics", get(metrics_handler));
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}
