//! Agricultural supply store models

use serde::{Deserialize, Serialize};

use crate::types::GpsCoordinates;

/// Placeholder for missing phone numbers and addresses
pub const NOT_AVAILABLE: &str = "Not available";

/// A store found by the nearest-facility search.
///
/// `place_id` is the places provider's identifier and the identity key:
/// two records with the same id are the same store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Facility {
    pub place_id: String,
    pub name: String,
    pub address: String,
    pub phone: String,
    #[serde(rename = "lat")]
    pub latitude: f64,
    #[serde(rename = "lng")]
    pub longitude: f64,
    /// Search radius in meters at which the store first appeared
    #[serde(rename = "radius_found")]
    pub radius_found_at: u32,
    /// Derived from the coordinates, never read back
    #[serde(rename = "maps_link", skip_deserializing)]
    pub map_link: String,
}

impl Facility {
    pub fn new(
        place_id: String,
        name: String,
        location: GpsCoordinates,
        radius_found_at: u32,
    ) -> Self {
        Self {
            place_id,
            name,
            address: NOT_AVAILABLE.to_string(),
            phone: NOT_AVAILABLE.to_string(),
            latitude: location.latitude,
            longitude: location.longitude,
            radius_found_at,
            map_link: map_link(&location),
        }
    }

    pub fn with_contact(mut self, phone: Option<String>, address: Option<String>) -> Self {
        self.phone = non_empty_or_unavailable(phone);
        self.address = non_empty_or_unavailable(address);
        self
    }

    pub fn location(&self) -> GpsCoordinates {
        GpsCoordinates::new(self.latitude, self.longitude)
    }
}

/// Map search URL pointing at a location
pub fn map_link(location: &GpsCoordinates) -> String {
    format!(
        "https://www.google.com/maps/search/?api=1&query={},{}",
        location.latitude, location.longitude
    )
}

/// Pick the international phone format, then the local one, then the placeholder
pub fn preferred_phone(international: Option<String>, local: Option<String>) -> String {
    international
        .filter(|p| !p.trim().is_empty())
        .or(local.filter(|p| !p.trim().is_empty()))
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

fn non_empty_or_unavailable(value: Option<String>) -> String {
    value
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}
