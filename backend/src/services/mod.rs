//! Business logic services for the rice disease diagnostics server

pub mod context;
pub mod detection_log;
pub mod facility;
pub mod prediction;
pub mod roi;

pub use context::ContextService;
pub use detection_log::DetectionLog;
pub use facility::{FacilityLocator, SearchPlan};
pub use prediction::{ModelSettings, PredictionRequest, PredictionResponse, PredictionService};
pub use roi::RoiExtractor;
