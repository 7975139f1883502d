//! Route definitions for the rice disease diagnostics API

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::{handlers, AppState};

/// Largest accepted leaf photo upload
const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health_check))
        // Diagnosis
        .route(
            "/predict",
            post(handlers::predict).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        // Disease catalog
        .nest("/diseases", disease_routes())
        // Store search
        .route("/agro-stores", get(handlers::list_agro_stores))
        .route("/stores/nearest", get(handlers::nearest_stores))
}

/// Disease catalog routes
fn disease_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_diseases))
        .route("/:disease_id", get(handlers::get_disease))
}
