//! Leaf classifier client
//!
//! Client for a TensorFlow-Serving style model server hosting the rice leaf
//! classifier. The model itself is opaque: a fixed-size RGB tensor goes in,
//! one probability per class comes out.

use async_trait::async_trait;
use reqwest::Client;
use serde::ser::{SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};

use crate::config::ClassifierConfig;
use crate::error::{AppError, AppResult};

/// Height x width x 3 image tensor, row-major, channel values 0-255
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTensor {
    pub width: u32,
    pub height: u32,
    pub data: Vec<f32>,
}

impl ImageTensor {
    pub const CHANNELS: usize = 3;

    pub fn pixel(&self, x: u32, y: u32) -> &[f32] {
        let start = (y as usize * self.width as usize + x as usize) * Self::CHANNELS;
        &self.data[start..start + Self::CHANNELS]
    }
}

struct Row<'a> {
    tensor: &'a ImageTensor,
    y: u32,
}

impl Serialize for Row<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.tensor.width as usize))?;
        for x in 0..self.tensor.width {
            seq.serialize_element(self.tensor.pixel(x, self.y))?;
        }
        seq.end()
    }
}

impl Serialize for ImageTensor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.height as usize))?;
        for y in 0..self.height {
            seq.serialize_element(&Row { tensor: self, y })?;
        }
        seq.end()
    }
}

/// Black-box image classifier
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Raw per-class probabilities in taxonomy order
    async fn classify(&self, tensor: &ImageTensor) -> AppResult<Vec<f64>>;
}

/// Client for the model server
#[derive(Clone)]
pub struct ClassifierClient {
    endpoint: String,
    http_client: Client,
}

/// Prediction request body
#[derive(Serialize)]
struct PredictRequest<'a> {
    instances: [&'a ImageTensor; 1],
}

/// Prediction response body
#[derive(Debug, Deserialize)]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Vec<f64>>,
    error: Option<String>,
}

impl ClassifierClient {
    /// Create a new classifier client
    pub fn new(config: &ClassifierConfig) -> AppResult<Self> {
        let http_client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            endpoint: config.endpoint.clone(),
            http_client,
        })
    }
}

#[async_trait]
impl Classifier for ClassifierClient {
    async fn classify(&self, tensor: &ImageTensor) -> AppResult<Vec<f64>> {
        let response = self
            .http_client
            .post(&self.endpoint)
            .json(&PredictRequest { instances: [tensor] })
            .send()
            .await
            .map_err(|e| AppError::Classifier(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Classifier(format!(
                "Model server returned {}: {}",
                status, body
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AppError::Classifier(format!("Failed to read response: {}", e)))?;

        parse_predictions(&body)
    }
}

/// Extract the first prediction row from a model-server response
pub fn parse_predictions(body: &str) -> AppResult<Vec<f64>> {
    let result: PredictResponse = serde_json::from_str(body)
        .map_err(|e| AppError::Classifier(format!("Failed to parse response: {}", e)))?;

    if let Some(error) = result.error {
        return Err(AppError::Classifier(error));
    }

    result
        .predictions
        .into_iter()
        .next()
        .ok_or_else(|| AppError::Classifier("Response contained no predictions".to_string()))
}
