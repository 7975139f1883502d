//! Configuration management for the rice disease diagnostics server
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with RDX_ prefix

use std::time::Duration;

use config::{ConfigError, Environment, File};
use serde::Deserialize;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Detection log database
    pub database: DatabaseConfig,

    /// Weather API configuration
    pub weather: WeatherConfig,

    /// Places search configuration
    pub places: PlacesConfig,

    /// Image classifier endpoint
    pub classifier: ClassifierConfig,

    /// Disease metadata catalog
    pub catalog: CatalogConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL; detection logging is off without it
    pub url: Option<String>,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WeatherConfig {
    /// Weather API endpoint
    pub api_endpoint: String,

    /// Weather API key
    pub api_key: String,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PlacesConfig {
    /// Places API base URL (nearbysearch/details live below it)
    pub api_endpoint: String,

    /// Places API key
    pub api_key: String,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// Ascending search radii in meters, reused by both search phases
    pub radii_meters: Vec<u32>,

    /// Keyword filter for agricultural input suppliers
    pub agro_keywords: String,

    /// Pause between successive radius queries
    pub pause_ms: u64,

    /// Number of stores the nearest search tries to collect
    pub max_results: usize,

    /// Upper bound on one expanding search, in seconds
    pub search_deadline_secs: u64,

    /// Radius for the single-query store listing
    pub store_listing_radius: u32,

    /// Maximum stores returned by the single-query listing
    pub store_listing_limit: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ClassifierConfig {
    /// Prediction endpoint of the model server
    pub endpoint: String,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// Square input size expected by the model
    pub image_size: u32,

    /// Model name reported in responses
    pub model_name: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CatalogConfig {
    /// Path to the disease metadata JSON
    pub path: String,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment = std::env::var("RDX_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 5000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.max_connections", 5)?
            .set_default("database.min_connections", 0)?
            .set_default("weather.api_endpoint", "https://api.openweathermap.org/data/2.5")?
            .set_default("weather.api_key", "")?
            .set_default("weather.timeout_secs", 10)?
            .set_default("places.api_endpoint", "https://maps.googleapis.com/maps/api/place")?
            .set_default("places.api_key", "")?
            .set_default("places.timeout_secs", 10)?
            .set_default(
                "places.radii_meters",
                vec![500, 1000, 2000, 5000, 10000, 20000, 30000],
            )?
            .set_default("places.agro_keywords", DEFAULT_AGRO_KEYWORDS)?
            .set_default("places.pause_ms", 300)?
            .set_default("places.max_results", 3)?
            .set_default("places.search_deadline_secs", 60)?
            .set_default("places.store_listing_radius", 5000)?
            .set_default("places.store_listing_limit", 10)?
            .set_default("classifier.endpoint", "http://localhost:8501/v1/models/rice:predict")?
            .set_default("classifier.timeout_secs", 30)?
            .set_default("classifier.image_size", 380)?
            .set_default("classifier.model_name", "EfficientNet")?
            .set_default("catalog.path", "data/diseases_data.json")?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (RDX_ prefix)
            .add_source(
                Environment::with_prefix("RDX")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

/// Keyword query used for the agricultural phase of the store search
pub const DEFAULT_AGRO_KEYWORDS: &str = "pesticide shop agro agency agro shop fertilizer shop \
fertiliser shop krushi kendra krishi kendra seed shop agro chemicals agri inputs \
pesticides fertilizers insecticide agro traders";

impl WeatherConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl PlacesConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn pause(&self) -> Duration {
        Duration::from_millis(self.pause_ms)
    }

    pub fn search_deadline(&self) -> Duration {
        Duration::from_secs(self.search_deadline_secs)
    }
}

impl ClassifierConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 5000,
            host: "0.0.0.0".to_string(),
        }
    }
}

impl Default for PlacesConfig {
    fn default() -> Self {
        Self {
            api_endpoint: "https://maps.googleapis.com/maps/api/place".to_string(),
            api_key: String::new(),
            timeout_secs: 10,
            radii_meters: vec![500, 1000, 2000, 5000, 10000, 20000, 30000],
            agro_keywords: DEFAULT_AGRO_KEYWORDS.to_string(),
            pause_ms: 300,
            max_results: 3,
            search_deadline_secs: 60,
            store_listing_radius: 5000,
            store_listing_limit: 10,
        }
    }
}
