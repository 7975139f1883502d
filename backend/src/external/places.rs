//! Places API client
//!
//! Client for the Google Places nearby-search and place-details endpoints.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::{preferred_phone, validate_api_key, GpsCoordinates, NOT_AVAILABLE};

use crate::config::PlacesConfig;
use crate::error::{AppError, AppResult};

/// Place type every nearby query is restricted to
const STORE_TYPE: &str = "store";

/// Detail fields requested per place
const DETAIL_FIELDS: &str = "formatted_phone_number,international_phone_number,formatted_address";

/// One candidate from a nearby search
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaceCandidate {
    pub place_id: Option<String>,
    pub name: Option<String>,
    pub location: Option<GpsCoordinates>,
    pub vicinity: Option<String>,
    pub rating: Option<f64>,
    pub open_now: Option<bool>,
    pub types: Vec<String>,
}

/// Contact details from a place-details lookup
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceDetails {
    pub phone: String,
    pub address: String,
}

impl PlaceDetails {
    pub fn unavailable() -> Self {
        Self {
            phone: NOT_AVAILABLE.to_string(),
            address: NOT_AVAILABLE.to_string(),
        }
    }
}

/// Geospatial store search
#[async_trait]
pub trait PlacesApi: Send + Sync {
    /// Fail when no usable credentials are configured
    fn check_credentials(&self) -> AppResult<()>;

    async fn nearby_search(
        &self,
        location: GpsCoordinates,
        radius_meters: u32,
        keyword: Option<&str>,
    ) -> AppResult<Vec<PlaceCandidate>>;

    async fn place_details(&self, place_id: &str) -> AppResult<PlaceDetails>;
}

/// Client for the places HTTP API
#[derive(Clone)]
pub struct PlacesClient {
    client: Client,
    api_key: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct NearbySearchResponse {
    #[serde(default)]
    results: Vec<NearbyResult>,
    #[serde(default)]
    status: String,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NearbyResult {
    place_id: Option<String>,
    name: Option<String>,
    geometry: Option<Geometry>,
    vicinity: Option<String>,
    rating: Option<f64>,
    opening_hours: Option<OpeningHours>,
    #[serde(default)]
    types: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: Option<LatLng>,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Deserialize)]
struct OpeningHours {
    open_now: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct DetailsResponse {
    result: Option<DetailsResult>,
    #[serde(default)]
    status: String,
}

#[derive(Debug, Deserialize)]
struct DetailsResult {
    international_phone_number: Option<String>,
    formatted_phone_number: Option<String>,
    formatted_address: Option<String>,
}

impl From<NearbyResult> for PlaceCandidate {
    fn from(r: NearbyResult) -> Self {
        PlaceCandidate {
            place_id: r.place_id.filter(|id| !id.is_empty()),
            name: r.name,
            location: r
                .geometry
                .and_then(|g| g.location)
                .map(|l| GpsCoordinates::new(l.lat, l.lng)),
            vicinity: r.vicinity,
            rating: r.rating,
            open_now: r.opening_hours.and_then(|h| h.open_now),
            types: r.types,
        }
    }
}

impl PlacesClient {
    /// Create a new places client
    pub fn new(config: &PlacesConfig) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.api_endpoint.trim_end_matches('/').to_string(),
        })
    }

    async fn get_json(&self, url: &str, params: &[(&str, String)]) -> AppResult<String> {
        let response = self
            .client
            .get(url)
            .query(params)
            .send()
            .await
            .map_err(|e| AppError::Places(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Places(format!("API returned {}: {}", status, body)));
        }

        response
            .text()
            .await
            .map_err(|e| AppError::Places(format!("Failed to read response: {}", e)))
    }
}

#[async_trait]
impl PlacesApi for PlacesClient {
    fn check_credentials(&self) -> AppResult<()> {
        validate_api_key(&self.api_key)
            .map_err(|msg| AppError::MissingCredentials(format!("Places API: {}", msg)))
    }

    async fn nearby_search(
        &self,
        location: GpsCoordinates,
        radius_meters: u32,
        keyword: Option<&str>,
    ) -> AppResult<Vec<PlaceCandidate>> {
        let url = format!("{}/nearbysearch/json", self.base_url);
        let mut params = vec![
            ("location", location.as_query()),
            ("radius", radius_meters.to_string()),
            ("type", STORE_TYPE.to_string()),
            ("key", self.api_key.clone()),
        ];
        if let Some(keyword) = keyword {
            params.push(("keyword", keyword.to_string()));
        }

        let body = self.get_json(&url, &params).await?;
        parse_nearby_search(&body)
    }

    async fn place_details(&self, place_id: &str) -> AppResult<PlaceDetails> {
        let url = format!("{}/details/json", self.base_url);
        let params = [
            ("place_id", place_id.to_string()),
            ("fields", DETAIL_FIELDS.to_string()),
            ("key", self.api_key.clone()),
        ];

        let body = self.get_json(&url, &params).await?;
        parse_place_details(&body)
    }
}

/// Parse a nearby-search body; `ZERO_RESULTS` is an empty list
pub fn parse_nearby_search(body: &str) -> AppResult<Vec<PlaceCandidate>> {
    let data: NearbySearchResponse = serde_json::from_str(body)
        .map_err(|e| AppError::Places(format!("Failed to parse response: {}", e)))?;

    match data.status.as_str() {
        "OK" | "ZERO_RESULTS" | "" => Ok(data.results.into_iter().map(Into::into).collect()),
        status => Err(AppError::Places(format!(
            "Search status {}: {}",
            status,
            data.error_message.unwrap_or_default()
        ))),
    }
}

/// Parse a place-details body into contact details
pub fn parse_place_details(body: &str) -> AppResult<PlaceDetails> {
    let data: DetailsResponse = serde_json::from_str(body)
        .map_err(|e| AppError::Places(format!("Failed to parse response: {}", e)))?;

    let Some(result) = data.result else {
        return match data.status.as_str() {
            "OK" | "" => Ok(PlaceDetails::unavailable()),
            status => Err(AppError::Places(format!("Details status {}", status))),
        };
    };

    Ok(PlaceDetails {
        phone: preferred_phone(
            result.international_phone_number,
            result.formatted_phone_number,
        ),
        address: result
            .formatted_address
            .filter(|a| !a.trim().is_empty())
            .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
    })
}
