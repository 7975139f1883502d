//! Leaf diagnosis pipeline
//!
//! decode -> leaf region -> tensor -> classifier -> weather/season
//! adjustment -> disease details and recommendations -> detection log

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use shared::{
    DiseaseCatalog, DiseaseInfo, GpsCoordinates, Language, ProbabilityAdjuster, RankedClass,
    Season, WeatherSnapshot,
};

use crate::error::{AppError, AppResult};
use crate::external::classifier::{Classifier, ImageTensor};
use crate::external::places::PlaceCandidate;
use crate::services::context::ContextService;
use crate::services::detection_log::{DetectionLog, DetectionRecord};
use crate::services::facility::FacilityLocator;
use crate::services::roi::{to_tensor, BoundingBox, FallbackReason, RegionOutcome, RoiExtractor};

/// One diagnosis request
#[derive(Debug, Clone)]
pub struct PredictionRequest {
    pub image: Vec<u8>,
    pub image_name: String,
    pub language: Language,
    pub coordinates: Option<GpsCoordinates>,
    pub place: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PredictionResponse {
    pub status: &'static str,
    pub prediction: PredictionBlock,
    pub disease_details: DiseaseInfo,
    pub context: PredictionContext,
    pub recommendations: Recommendations,
    pub metadata: ModelMetadata,
}

#[derive(Debug, Serialize)]
pub struct PredictionBlock {
    pub final_disease: String,
    pub confidence: f64,
    pub top_predictions: Vec<RankedClass>,
    pub all_probabilities: BTreeMap<String, f64>,
    pub adjusted_probabilities: BTreeMap<String, f64>,
}

/// Weather as reported to clients
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum WeatherContext {
    Available(WeatherSnapshot),
    Unavailable(&'static str),
}

impl From<Option<WeatherSnapshot>> for WeatherContext {
    fn from(weather: Option<WeatherSnapshot>) -> Self {
        weather.map_or(WeatherContext::Unavailable("unavailable"), WeatherContext::Available)
    }
}

#[derive(Debug, Serialize)]
pub struct LeafRegion {
    pub cropped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounds: Option<BoundingBox>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<FallbackReason>,
}

impl From<&RegionOutcome> for LeafRegion {
    fn from(outcome: &RegionOutcome) -> Self {
        match outcome {
            RegionOutcome::Cropped { bounds, .. } => LeafRegion {
                cropped: true,
                bounds: Some(*bounds),
                fallback: None,
            },
            RegionOutcome::FullImage { reason, .. } => LeafRegion {
                cropped: false,
                bounds: None,
                fallback: Some(*reason),
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RequestLocation {
    pub coordinates: Option<GpsCoordinates>,
    pub place: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PredictionContext {
    pub season: Season,
    pub season_name: &'static str,
    pub weather: WeatherContext,
    pub location: RequestLocation,
    pub leaf_region: LeafRegion,
    pub timestamp: DateTime<Utc>,
    pub image_filename: String,
    pub language: &'static str,
}

/// Nearby store listing attached to a diagnosis
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StoreLookup {
    Success {
        count: usize,
        radius: u32,
        stores: Vec<PlaceCandidate>,
    },
    Unavailable {
        message: String,
    },
}

#[derive(Debug, Serialize)]
pub struct Recommendations {
    pub immediate_actions: Vec<String>,
    pub pesticides: Vec<Value>,
    pub government_schemes: Vec<Value>,
    pub nearby_stores: StoreLookup,
}

#[derive(Debug, Serialize)]
pub struct ModelMetadata {
    pub model_used: String,
    pub image_size: u32,
    pub total_diseases_tracked: usize,
}

/// Model input settings
#[derive(Debug, Clone)]
pub struct ModelSettings {
    pub image_size: u32,
    pub model_name: String,
    /// Radius of the store listing attached to each diagnosis
    pub store_radius: u32,
}

#[derive(Clone)]
pub struct PredictionService {
    classifier: Arc<dyn Classifier>,
    adjuster: Arc<ProbabilityAdjuster>,
    context: ContextService,
    catalog: Arc<DiseaseCatalog>,
    locator: FacilityLocator,
    detection_log: DetectionLog,
    roi: RoiExtractor,
    settings: ModelSettings,
}

impl PredictionService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        classifier: Arc<dyn Classifier>,
        adjuster: Arc<ProbabilityAdjuster>,
        context: ContextService,
        catalog: Arc<DiseaseCatalog>,
        locator: FacilityLocator,
        detection_log: DetectionLog,
        roi: RoiExtractor,
        settings: ModelSettings,
    ) -> Self {
        Self {
            classifier,
            adjuster,
            context,
            catalog,
            locator,
            detection_log,
            roi,
            settings,
        }
    }

    pub async fn predict(&self, request: PredictionRequest) -> AppResult<PredictionResponse> {
        let (tensor, leaf_region) = self.prepare_image(request.image).await?;

        let weather = self
            .context
            .fetch_weather(request.coordinates, request.place.as_deref())
            .await;
        let season = self.context.season_today();

        let raw = self.classifier.classify(&tensor).await?;
        let adjusted = self.adjuster.adjust(&raw, weather.as_ref(), season)?;

        tracing::info!(
            label = %adjusted.final_label,
            confidence = adjusted.confidence,
            %season,
            weather = weather.is_some(),
            "Leaf diagnosed"
        );

        let all_probabilities = probability_map(self.adjuster.labelled(&raw));
        let disease_details = self
            .catalog
            .lookup(&adjusted.final_label, request.language);
        let nearby_stores = self.nearby_stores(request.coordinates).await;
        let timestamp = Utc::now();

        self.detection_log
            .record(&DetectionRecord {
                image_name: request.image_name.clone(),
                prediction: adjusted.final_label.clone(),
                confidence: adjusted.confidence,
                raw_probabilities: serde_json::to_value(&all_probabilities)
                    .unwrap_or(Value::Null),
                weather: weather.clone(),
                season,
                coordinates: request.coordinates,
                place: request.place.clone(),
                language: request.language,
                created_at: timestamp,
            })
            .await;

        Ok(PredictionResponse {
            status: "success",
            prediction: PredictionBlock {
                final_disease: adjusted.final_label,
                confidence: adjusted.confidence,
                top_predictions: adjusted.top_k,
                all_probabilities,
                adjusted_probabilities: probability_map(
                    self.adjuster.labelled(adjusted.adjusted.values()),
                ),
            },
            recommendations: Recommendations {
                immediate_actions: disease_details.cure_steps.clone(),
                pesticides: disease_details.recommended_pesticides.clone(),
                government_schemes: disease_details.eligible_schemes.clone(),
                nearby_stores,
            },
            disease_details,
            context: PredictionContext {
                season,
                season_name: season.local_name(),
                weather: weather.into(),
                location: RequestLocation {
                    coordinates: request.coordinates,
                    place: request.place,
                },
                leaf_region,
                timestamp,
                image_filename: request.image_name,
                language: request.language.code(),
            },
            metadata: ModelMetadata {
                model_used: self.settings.model_name.clone(),
                image_size: self.settings.image_size,
                total_diseases_tracked: self.adjuster.taxonomy().len(),
            },
        })
    }

    /// Decode, crop and resize off the async workers
    async fn prepare_image(&self, bytes: Vec<u8>) -> AppResult<(ImageTensor, LeafRegion)> {
        let roi = self.roi.clone();
        let size = self.settings.image_size;

        tokio::task::spawn_blocking(move || -> AppResult<(ImageTensor, LeafRegion)> {
            let image = image::load_from_memory(&bytes)
                .map_err(|e| AppError::InvalidImage(e.to_string()))?;
            let outcome = roi.extract(&image);
            let tensor = to_tensor(outcome.image(), size);
            Ok((tensor, LeafRegion::from(&outcome)))
        })
        .await
        .map_err(|e| AppError::Internal(format!("Image preprocessing task failed: {}", e)))?
    }

    async fn nearby_stores(&self, coordinates: Option<GpsCoordinates>) -> StoreLookup {
        let Some(coords) = coordinates else {
            return StoreLookup::Unavailable {
                message: "Coordinates required for store lookup".to_string(),
            };
        };

        let radius = self.settings.store_radius;
        match self.locator.list_stores(coords, radius).await {
            Ok(stores) => StoreLookup::Success {
                count: stores.len(),
                radius,
                stores,
            },
            Err(e) => {
                tracing::warn!("Store listing unavailable: {}", e);
                StoreLookup::Unavailable {
                    message: e.to_string(),
                }
            }
        }
    }
}

fn probability_map(ranked: Vec<RankedClass>) -> BTreeMap<String, f64> {
    ranked
        .into_iter()
        .map(|r| (r.class, r.confidence))
        .collect()
}
