//! Disease catalog HTTP handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use shared::{DiseaseInfo, DiseaseSummary, GpsCoordinates, Language};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::AppState;

#[derive(Serialize)]
pub struct DiseaseListResponse {
    pub status: &'static str,
    pub count: usize,
    pub diseases: Vec<DiseaseSummary>,
}

/// List every disease in the catalog
pub async fn list_diseases(State(state): State<AppState>) -> Json<DiseaseListResponse> {
    let diseases = state.catalog.summaries();
    Json(DiseaseListResponse {
        status: "success",
        count: diseases.len(),
        diseases,
    })
}

/// Query parameters for a disease lookup
#[derive(Debug, Deserialize, Validate)]
pub struct DiseaseQuery {
    pub lang: Option<String>,
    #[validate(range(min = -90.0, max = 90.0))]
    pub lat: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0))]
    pub lon: Option<f64>,
}

#[derive(Serialize)]
pub struct DiseaseResponse {
    pub status: &'static str,
    pub disease: DiseaseInfo,
    pub coordinates_used: Option<GpsCoordinates>,
}

/// Full details of one disease in the requested language
pub async fn get_disease(
    State(state): State<AppState>,
    Path(disease_id): Path<String>,
    Query(query): Query<DiseaseQuery>,
) -> AppResult<Json<DiseaseResponse>> {
    query.validate()?;

    let language = Language::from_code(query.lang.as_deref().unwrap_or("en"));
    let disease = state.catalog.lookup(&disease_id, language);
    if !disease.found {
        return Err(AppError::NotFound(format!("Disease '{}'", disease_id)));
    }

    let coordinates_used = match (query.lat, query.lon) {
        (Some(lat), Some(lon)) => Some(GpsCoordinates::new(lat, lon)),
        _ => None,
    };

    Ok(Json(DiseaseResponse {
        status: "success",
        disease,
        coordinates_used,
    }))
}
