//! Health check handlers

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use shared::validate_api_key;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub classifier_configured: bool,
    pub classifier_endpoint: String,
    pub diseases_loaded: usize,
    pub places_configured: bool,
    pub weather_configured: bool,
    pub database_configured: bool,
}

/// Health check endpoint handler
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
        classifier_configured: !state.config.classifier.endpoint.trim().is_empty(),
        classifier_endpoint: state.config.classifier.endpoint.clone(),
        diseases_loaded: state.catalog.len(),
        places_configured: validate_api_key(&state.config.places.api_key).is_ok(),
        weather_configured: validate_api_key(&state.config.weather.api_key).is_ok(),
        database_configured: state.detection_log.is_enabled(),
    })
}
