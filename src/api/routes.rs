use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::{request_id_middleware, span_for_request};

use super::handlers;
use super::AppState;

/// Creates the Presenter-facing router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        // Session
        .route("/pages", post(handlers::load_page))
        .route("/history", get(handlers::get_history))
        // Recommendations
        .route("/recommendations", get(handlers::get_recommendations))
        .route("/recommendations/refresh", post(handlers::refresh_recommendations))
        // Tracking
        .route("/interactions", post(handlers::record_interaction))
        .route("/posts/:id/like", post(handlers::like))
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(span_for_request))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
