//! Agricultural store search HTTP handlers

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use shared::{Facility, GpsCoordinates};
use validator::Validate;

use crate::error::AppResult;
use crate::external::places::PlaceCandidate;
use crate::AppState;

/// Query parameters for the single-radius store listing
#[derive(Debug, Deserialize, Validate)]
pub struct StoreListingQuery {
    #[validate(range(min = -90.0, max = 90.0))]
    pub lat: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub lon: f64,
    #[validate(range(min = 1, max = 50000))]
    pub radius: Option<u32>,
}

#[derive(Serialize)]
pub struct StoreListingResponse {
    pub status: &'static str,
    pub count: usize,
    pub stores: Vec<PlaceCandidate>,
    pub location: GpsCoordinates,
    pub radius: u32,
}

/// Agricultural stores within one radius
pub async fn list_agro_stores(
    State(state): State<AppState>,
    Query(query): Query<StoreListingQuery>,
) -> AppResult<Json<StoreListingResponse>> {
    query.validate()?;

    let location = GpsCoordinates::new(query.lat, query.lon);
    let radius = query
        .radius
        .unwrap_or(state.config.places.store_listing_radius);
    let stores = state.locator.list_stores(location, radius).await?;

    Ok(Json(StoreListingResponse {
        status: "success",
        count: stores.len(),
        stores,
        location,
        radius,
    }))
}

/// Query parameters for the nearest-store search
#[derive(Debug, Deserialize, Validate)]
pub struct NearestStoresQuery {
    #[validate(range(min = -90.0, max = 90.0))]
    pub lat: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub lon: f64,
}

#[derive(Serialize)]
pub struct NearestStoresResponse {
    pub status: &'static str,
    pub total_found: usize,
    pub coordinates_used: GpsCoordinates,
    pub shops: Vec<Facility>,
}

/// The nearest stores found by the expanding-radius search
pub async fn nearest_stores(
    State(state): State<AppState>,
    Query(query): Query<NearestStoresQuery>,
) -> AppResult<Json<NearestStoresResponse>> {
    query.validate()?;

    let coordinates = GpsCoordinates::new(query.lat, query.lon);
    let shops = state
        .locator
        .find_nearest_with(coordinates, &state.shutdown.child_token())
        .await?;

    Ok(Json(NearestStoresResponse {
        status: "success",
        total_found: shops.len(),
        coordinates_used: coordinates,
        shops,
    }))
}
