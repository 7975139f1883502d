//! Weather API client for fetching current conditions
//!
//! Integrates with the OpenWeatherMap current-weather endpoint, queried by
//! coordinates or by place name.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use shared::{GpsCoordinates, WeatherSnapshot};

use crate::config::WeatherConfig;
use crate::error::{AppError, AppResult};

/// Location to fetch weather for
#[derive(Debug, Clone, PartialEq)]
pub enum WeatherQuery {
    Coordinates(GpsCoordinates),
    Place(String),
}

impl WeatherQuery {
    /// Coordinates win over a place name; blank names count as absent
    pub fn resolve(coords: Option<GpsCoordinates>, place: Option<&str>) -> Option<Self> {
        match (coords, place.map(str::trim).filter(|p| !p.is_empty())) {
            (Some(c), _) => Some(WeatherQuery::Coordinates(c)),
            (None, Some(p)) => Some(WeatherQuery::Place(p.to_string())),
            (None, None) => None,
        }
    }
}

/// Source of current weather conditions
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn current(&self, query: &WeatherQuery) -> AppResult<WeatherSnapshot>;
}

/// Weather API client
#[derive(Clone)]
pub struct WeatherClient {
    client: Client,
    api_key: String,
    base_url: String,
}

/// OpenWeatherMap API response for current weather
#[derive(Debug, Deserialize)]
struct OWMCurrentResponse {
    #[serde(default)]
    weather: Vec<OWMWeather>,
    main: OWMMain,
    wind: Option<OWMWind>,
    rain: Option<serde_json::Value>,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OWMWeather {
    main: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct OWMMain {
    temp: f64,
    pressure: f64,
    humidity: f64,
}

#[derive(Debug, Deserialize)]
struct OWMWind {
    speed: f64,
}

impl WeatherClient {
    /// Create a new WeatherClient
    pub fn new(config: &WeatherConfig) -> AppResult<Self> {
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

    fn query_params(&self, query: &WeatherQuery) -> Vec<(&'static str, String)> {
        let mut params = match query {
            WeatherQuery::Coordinates(c) => vec![
                ("lat", c.latitude.to_string()),
                ("lon", c.longitude.to_string()),
            ],
            WeatherQuery::Place(name) => vec![("q", name.clone())],
        };
        params.push(("appid", self.api_key.clone()));
        params.push(("units", "metric".to_string()));
        params
    }
}

#[async_trait]
impl WeatherProvider for WeatherClient {
    async fn current(&self, query: &WeatherQuery) -> AppResult<WeatherSnapshot> {
        let url = format!("{}/weather", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&self.query_params(query))
            .send()
            .await
            .map_err(|e| AppError::Weather(format!("Weather API request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Weather(format!(
                "Weather API error: {} - {}",
                status, body
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AppError::Weather(format!("Failed to read weather response: {}", e)))?;

        parse_current_weather(&body)
    }
}

/// Convert an OpenWeatherMap current-weather body into a snapshot
pub fn parse_current_weather(body: &str) -> AppResult<WeatherSnapshot> {
    let data: OWMCurrentResponse = serde_json::from_str(body)
        .map_err(|e| AppError::Weather(format!("Failed to parse weather response: {}", e)))?;

    let weather = data.weather.first();

    Ok(WeatherSnapshot {
        humidity: data.main.humidity,
        temperature: data.main.temp,
        rain: data.rain.is_some(),
        pressure: data.main.pressure,
        wind_speed: data.wind.map(|w| w.speed).unwrap_or(0.0),
        condition: weather
            .map(|w| w.main.clone())
            .unwrap_or_else(|| "Unknown".to_string()),
        description: weather
            .map(|w| w.description.clone())
            .unwrap_or_else(|| "Unknown".to_string()),
        location_name: data.name.unwrap_or_else(|| "Unknown".to_string()),
    })
}
