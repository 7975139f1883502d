//! WebAssembly module for Rice Leaf Disease Diagnostics
//!
//! Provides client-side computation for:
//! - Context-aware re-weighting of classifier output
//! - Crop season lookup
//! - Weather risk checks
//! - Store map links for offline result pages

use serde::Deserialize;
use wasm_bindgen::prelude::*;

// Re-export shared types for use in JavaScript
pub use shared::models::*;
pub use shared::types::*;
pub use shared::validation::*;

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    log("rice disease diagnostics module loaded");
}

/// Weather fields the adjustment reads; the rest default
#[derive(Debug, Deserialize)]
struct WeatherInput {
    humidity: f64,
    temperature: f64,
    #[serde(default)]
    rain: bool,
}

impl From<WeatherInput> for WeatherSnapshot {
    fn from(input: WeatherInput) -> Self {
        Self {
            humidity: input.humidity,
            temperature: input.temperature,
            rain: input.rain,
            pressure: 0.0,
            wind_speed: 0.0,
            condition: String::new(),
            description: String::new(),
            location_name: String::new(),
        }
    }
}

/// Re-weight raw class probabilities with weather and season.
///
/// `raw_json` is an array of seven numbers in taxonomy order. `weather_json`
/// is `{"humidity", "temperature", "rain"}` or empty when unknown. Returns
/// the adjusted prediction as JSON.
#[wasm_bindgen]
pub fn adjust_probabilities(
    raw_json: &str,
    weather_json: &str,
    season: &str,
) -> Result<String, JsValue> {
    let raw: Vec<f64> = serde_json::from_str(raw_json)
        .map_err(|e| JsValue::from_str(&format!("Invalid probabilities JSON: {}", e)))?;

    let weather = parse_weather(weather_json).map_err(|e| JsValue::from_str(&e))?;
    let season: Season = season.parse().map_err(|e: String| JsValue::from_str(&e))?;

    let prediction = ProbabilityAdjuster::default()
        .adjust(&raw, weather.as_ref(), season)
        .map_err(|e| JsValue::from_str(&e.to_string()))?;

    serde_json::to_string(&prediction).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Season name for a 1-based month, empty for an invalid month
#[wasm_bindgen]
pub fn season_for_month(month: u32) -> String {
    Season::for_month(month)
        .map(|s| s.to_string())
        .unwrap_or_default()
}

/// Season for today's date in the browser's time zone
#[wasm_bindgen]
pub fn current_season_name() -> String {
    // getMonth is 0-based
    let month = js_sys::Date::new_0().get_month() + 1;
    season_for_month(month)
}

/// Whether a reading favours leaf disease
#[wasm_bindgen]
pub fn is_risky_weather(humidity: f64, temperature: f64, rain: bool) -> bool {
    WeatherRiskRule::default().is_risky_reading(humidity, temperature, rain)
}

/// Map search link for a store, empty for invalid coordinates
#[wasm_bindgen]
pub fn facility_map_link(latitude: f64, longitude: f64) -> String {
    let location = GpsCoordinates::new(latitude, longitude);
    if validate_coordinates(&location).is_err() {
        return String::new();
    }
    map_link(&location)
}

fn parse_weather(json: &str) -> Result<Option<WeatherSnapshot>, String> {
    if json.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str::<WeatherInput>(json)
        .map(|w| Some(w.into()))
        .map_err(|e| format!("Invalid weather JSON: {}", e))
}

#[cfg(target_arch = "wasm32")]
fn log(message: &str) {
    web_sys::console::log_1(&JsValue::from_str(message));
}

#[cfg(not(target_arch = "wasm32"))]
fn log(_message: &str) {}
