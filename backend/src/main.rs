//! Rice Leaf Disease Diagnostics - Backend Server
//!
//! Diagnoses rice leaf photos, re-weights the classifier output with local
//! weather and crop season, and finds nearby agricultural input stores.

use axum::{routing::get, Router};
use shared::{DiseaseCatalog, ProbabilityAdjuster};
use sqlx::postgres::PgPoolOptions;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod error;
mod external;
mod handlers;
mod routes;
mod services;

pub use config::Config;

use external::{ClassifierClient, PlacesClient, WeatherClient};
use services::{
    ContextService, DetectionLog, FacilityLocator, ModelSettings, PredictionService, RoiExtractor,
    SearchPlan,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub catalog: Arc<DiseaseCatalog>,
    pub prediction: PredictionService,
    pub locator: FacilityLocator,
    pub detection_log: DetectionLog,
    /// Cancelled on shutdown; long store searches derive child tokens
    pub shutdown: CancellationToken,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rdx_server=debug,tower_http=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::load()?;

    tracing::info!("Starting Rice Disease Diagnostics Server");
    tracing::info!("Environment: {}", config.environment);

    let catalog = Arc::new(load_catalog(&config.catalog.path));
    let detection_log = connect_detection_log(&config).await?;

    let places = Arc::new(PlacesClient::new(&config.places)?);
    let locator = FacilityLocator::new(places, SearchPlan::try_from(&config.places)?)?;
    let context = ContextService::new(Arc::new(WeatherClient::new(&config.weather)?));
    let classifier = Arc::new(ClassifierClient::new(&config.classifier)?);

    let prediction = PredictionService::new(
        classifier,
        Arc::new(ProbabilityAdjuster::default()),
        context,
        catalog.clone(),
        locator.clone(),
        detection_log.clone(),
        RoiExtractor::default(),
        ModelSettings {
            image_size: config.classifier.image_size,
            model_name: config.classifier.model_name.clone(),
            store_radius: config.places.store_listing_radius,
        },
    );

    let shutdown = CancellationToken::new();

    // Create application state
    let state = AppState {
        config: Arc::new(config.clone()),
        catalog,
        prediction,
        locator,
        detection_log,
        shutdown: shutdown.clone(),
    };

    // Build application
    let app = create_app(state);

    // Start server
    let host: std::net::IpAddr = config.server.host.parse()?;
    let addr = SocketAddr::from((host, config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    Ok(())
}

/// Read the disease catalog; a missing or broken file leaves it empty
fn load_catalog(path: &str) -> DiseaseCatalog {
    let catalog = std::fs::read_to_string(path)
        .map_err(anyhow::Error::from)
        .and_then(|json| DiseaseCatalog::from_json(&json).map_err(anyhow::Error::from));

    match catalog {
        Ok(catalog) => {
            tracing::info!("Loaded {} diseases from {}", catalog.len(), path);
            catalog
        }
        Err(e) => {
            tracing::warn!("Disease catalog unavailable at {}: {}", path, e);
            DiseaseCatalog::default()
        }
    }
}

/// Detection log backed by a lazily connected pool, if a database is configured
async fn connect_detection_log(config: &Config) -> anyhow::Result<DetectionLog> {
    let Some(url) = config.database.url.as_deref().filter(|u| !u.trim().is_empty()) else {
        tracing::info!("No database configured, detection logging disabled");
        return Ok(DetectionLog::disabled());
    };

    let db_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect_lazy(url)?;

    // Run migrations in development
    if config.environment == "development" {
        tracing::info!("Running database migrations...");
        match sqlx::migrate!("./migrations").run(&db_pool).await {
            Ok(()) => tracing::info!("Migrations completed"),
            Err(e) => tracing::warn!("Migrations skipped: {}", e),
        }
    }

    Ok(DetectionLog::new(db_pool))
}

/// Resolve on Ctrl+C, cancelling in-flight store searches
async fn shutdown_signal(shutdown: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
    shutdown.cancel();
}

/// Create the application router with all routes and middleware
fn create_app(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", routes::api_routes())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(cors),
        )
        .with_state(state)
}

/// Root endpoint
async fn root() -> &'static str {
    "Rice Leaf Disease Diagnostics API v1.0"
}
