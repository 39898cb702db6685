//! Axum router configuration with middleware.
//!
//! All routes are under `/api/v1/`.
//! Middleware: CORS, tracing.

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route(
            "/drafts",
            get(handlers::draft::list_drafts).post(handlers::draft::create_draft),
        )
        // Literal segments must be registered alongside `{id}`; axum prefers them.
        .route("/drafts/import", post(handlers::draft::import_draft))
        .route("/drafts/cleanup", post(handlers::draft::cleanup_drafts))
        .route(
            "/drafts/{id}",
            get(handlers::draft::get_draft)
                .put(handlers::draft::save_draft)
                .delete(handlers::draft::delete_draft),
        )
        .route("/drafts/{id}/export", get(handlers::draft::export_draft));

    Router::new()
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
