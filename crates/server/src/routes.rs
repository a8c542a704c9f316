//! Route configuration.

use crate::handlers;
use crate::handlers::common::MULTIPART_OVERHEAD;
use crate::metrics::metrics_handler;
use crate::state::AppState;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let body_limit = state.max_chunk_size().saturating_add(MULTIPART_OVERHEAD);

    let upload_routes = Router::new()
        .route("/upload", post(handlers::upload_chunk))
        .route("/upload/chunks", get(handlers::list_chunks))
        .route("/upload/merge", post(handlers::merge_upload))
        .layer(DefaultBodyLimit::max(body_limit));

    let asset_routes = Router::new()
        .route("/assets", get(handlers::list_assets))
        .route("/assets/{name}", get(handlers::get_asset));

    let service_routes = Router::new()
        .route("/", get(handlers::index))
        .route("/v1/health", get(handlers::health_check))
        .route("/v1/capabilities", get(handlers::get_capabilities));

    let mut router = Router::new()
        .merge(upload_routes)
        .merge(asset_routes)
        .merge(service_routes)
        .fallback(handlers::not_found);

    // The metrics endpoint is unauthenticated; restrict it at the network level.
    if state.config.server.metrics_enabled {
        router = router.route("/metrics", get(metrics_handler));
    }

    if state.config.server.cors_permissive {
        router = router.layer(CorsLayer::permissive());
    }

    router
        .layer(TimeoutLayer::new(state.config.server.request_timeout()))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
