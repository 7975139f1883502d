//! Validation utilities for diagnosis and store-search inputs

use crate::types::GpsCoordinates;

/// Key values shipped in sample configs that must never reach a provider
const PLACEHOLDER_KEYS: &[&str] = &[
    "YOUR_API_KEY",
    "YOUR_GOOGLE_MAPS_API_KEY",
    "changeme",
];

// ============================================================================
// Location Validations
// ============================================================================

/// Validate latitude/longitude are finite and within range
pub fn validate_coordinates(coords: &GpsCoordinates) -> Result<(), &'static str> {
    if !coords.latitude.is_finite() || !coords.longitude.is_finite() {
        return Err("Coordinates must be finite numbers");
    }
    if coords.latitude.abs() > 90.0 {
        return Err("Latitude must be between -90 and 90");
    }
    if coords.longitude.abs() > 180.0 {
        return Err("Longitude must be between -180 and 180");
    }
    Ok(())
}

/// Parse optional form values into coordinates.
///
/// Both absent (or blank) is `Ok(None)`; only one present, or either
/// unparseable, is an error.
pub fn parse_coordinates(
    lat: Option<&str>,
    lon: Option<&str>,
) -> Result<Option<GpsCoordinates>, &'static str> {
    let lat = lat.map(str::trim).filter(|s| !s.is_empty());
    let lon = lon.map(str::trim).filter(|s| !s.is_empty());

    match (lat, lon) {
        (None, None) => Ok(None),
        (Some(lat), Some(lon)) => {
            let latitude = lat
                .parse::<f64>()
                .map_err(|_| "Invalid latitude/longitude format")?;
            let longitude = lon
                .parse::<f64>()
                .map_err(|_| "Invalid latitude/longitude format")?;
            let coords = GpsCoordinates::new(latitude, longitude);
            validate_coordinates(&coords)?;
            Ok(Some(coords))
        }
        _ => Err("Latitude and longitude must be given together"),
    }
}

// ============================================================================
// Credential Validations
// ============================================================================

/// Validate an external API key is present and not a sample placeholder
pub fn validate_api_key(key: &str) -> Result<(), &'static str> {
    let key = key.trim();
    if key.is_empty() {
        return Err("API key is not configured");
    }
    if PLACEHOLDER_KEYS.iter().any(|p| key.eq_ignore_ascii_case(p)) {
        return Err("API key is still a placeholder");
    }
    if key.chars().any(char::is_whitespace) {
        return Err("API key must not contain whitespace");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_coordinates() {
        assert!(validate_coordinates(&GpsCoordinates::new(20.29, 85.82)).is_ok());
        assert!(validate_coordinates(&GpsCoordinates::new(-90.0, 180.0)).is_ok());
        assert!(validate_coordinates(&GpsCoordinates::new(90.1, 0.0)).is_err());
        assert!(validate_coordinates(&GpsCoordinates::new(0.0, -180.5)).is_err());
        assert!(validate_coordinates(&GpsCoordinates::new(f64::NAN, 0.0)).is_err());
    }

    #[test]
    fn test_parse_coordinates_pairs() {
        assert_eq!(parse_coordinates(None, None), Ok(None));
        assert_eq!(parse_coordinates(Some(""), Some("  ")), Ok(None));
        assert_eq!(
            parse_coordinates(Some("18.52"), Some("73.85")),
            Ok(Some(GpsCoordinates::new(18.52, 73.85)))
        );
        assert!(parse_coordinates(Some("18.52"), None).is_err());
        assert!(parse_coordinates(Some("north"), Some("73.85")).is_err());
        assert!(parse_coordinates(Some("118.52"), Some("73.85")).is_err());
    }

    #[test]
    fn test_validate_api_key() {
        assert!(validate_api_key("AIzaSyExampleKey123").is_ok());
        assert!(validate_api_key("").is_err());
        assert!(validate_api_key("   ").is_err());
        assert!(validate_api_key("YOUR_GOOGLE_MAPS_API_KEY").is_err());
        assert!(validate_api_key("abc def").is_err());
    }
}
