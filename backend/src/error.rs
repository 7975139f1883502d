//! Error handling for the rice disease diagnostics server
//!
//! Only fatal outcomes live here. Degraded results (no weather, no leaf
//! region, fewer than three stores) are ordinary values, not errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shared::AdjustError;
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Precondition failures
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Probability vector has {actual} entries, expected {expected}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("Invalid classifier output: {0}")]
    InvalidProbabilities(String),

    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),

    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    #[error("Validation error: {message}")]
    Validation { field: String, message: String },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    // External service errors
    #[error("Classifier error: {0}")]
    Classifier(String),

    #[error("Weather service error: {0}")]
    Weather(String),

    #[error("Places service error: {0}")]
    Places(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

impl From<AdjustError> for AppError {
    fn from(err: AdjustError) -> Self {
        match err {
            AdjustError::ShapeMismatch { expected, actual } => {
                AppError::ShapeMismatch { expected, actual }
            }
            other => AppError::InvalidProbabilities(other.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let field = errors
            .field_errors()
            .keys()
            .next()
            .map(|k| k.to_string())
            .unwrap_or_default();
        AppError::Validation {
            field,
            message: errors.to_string(),
        }
    }
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub status: &'static str,
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, Option<String>) {
        match self {
            AppError::InvalidImage(_) => (StatusCode::BAD_REQUEST, "INVALID_IMAGE", None),
            AppError::ShapeMismatch { .. } => (StatusCode::BAD_GATEWAY, "SHAPE_MISMATCH", None),
            AppError::InvalidProbabilities(_) => {
                (StatusCode::BAD_GATEWAY, "INVALID_PROBABILITIES", None)
            }
            AppError::InvalidCoordinates(_) => {
                (StatusCode::BAD_REQUEST, "INVALID_COORDINATES", None)
            }
            AppError::MissingCredentials(_) => {
                (StatusCode::BAD_REQUEST, "MISSING_CREDENTIALS", None)
            }
            AppError::Validation { field, .. } => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                Some(field.clone()),
            ),
            AppError::ValidationError(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", None),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND", None),
            AppError::Classifier(_) => (StatusCode::BAD_GATEWAY, "CLASSIFIER_ERROR", None),
            AppError::Weather(_) => (StatusCode::BAD_GATEWAY, "WEATHER_SERVICE_ERROR", None),
            AppError::Places(_) => (StatusCode::BAD_GATEWAY, "PLACES_SERVICE_ERROR", None),
            AppError::Configuration(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "CONFIGURATION_ERROR",
                None,
            ),
            AppError::DatabaseError(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR", None)
            }
            AppError::Internal(_) | AppError::InternalError(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", None)
            }
        }
    }

    fn public_message(&self) -> String {
        match self {
            AppError::NotFound(resource) => format!("{} not found", resource),
            AppError::DatabaseError(_) => "A database error occurred".to_string(),
            AppError::InternalError(_) => "An internal server error occurred".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, field) = self.parts();
        let error_detail = ErrorDetail {
            code: code.to_string(),
            message: self.public_message(),
            field,
        };

        // Log the error for debugging
        tracing::error!("Error: {:?}", self);

        (
            status,
            Json(ErrorResponse {
                status: "error",
                error: error_detail,
            }),
        )
            .into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;
