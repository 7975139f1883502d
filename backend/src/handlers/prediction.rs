//! Leaf diagnosis HTTP handler

use axum::{
    extract::{multipart::Field, Multipart, State},
    Json,
};
use shared::{parse_coordinates, Language};

use crate::error::{AppError, AppResult};
use crate::services::{PredictionRequest, PredictionResponse};
use crate::AppState;

/// Name used when the upload carries no usable file name
const DEFAULT_IMAGE_NAME: &str = "upload";

/// Multipart fields of a diagnosis request
#[derive(Debug, Default)]
struct PredictForm {
    image: Option<(String, Vec<u8>)>,
    lang: Option<String>,
    location: Option<String>,
    lat: Option<String>,
    lon: Option<String>,
}

impl PredictForm {
    async fn read(multipart: &mut Multipart) -> AppResult<Self> {
        let mut form = PredictForm::default();

        while let Some(field) = multipart.next_field().await.map_err(form_error)? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            match name.as_str() {
                "image" => {
                    let file_name = sanitize_file_name(field.file_name().unwrap_or_default());
                    let bytes = field.bytes().await.map_err(form_error)?;
                    form.image = Some((file_name, bytes.to_vec()));
                }
                "lang" => form.lang = Some(text(field).await?),
                "location" => form.location = Some(text(field).await?),
                "lat" => form.lat = Some(text(field).await?),
                "lon" => form.lon = Some(text(field).await?),
                other => tracing::debug!("Ignoring form field {}", other),
            }
        }

        Ok(form)
    }
}

async fn text(field: Field<'_>) -> AppResult<String> {
    field.text().await.map_err(form_error)
}

fn form_error(e: axum::extract::multipart::MultipartError) -> AppError {
    AppError::ValidationError(format!("Malformed multipart body: {}", e))
}

/// Keep the base name and only portable characters
fn sanitize_file_name(raw: &str) -> String {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');

    if cleaned.is_empty() {
        DEFAULT_IMAGE_NAME.to_string()
    } else {
        cleaned.to_string()
    }
}

/// Diagnose an uploaded leaf photo
pub async fn predict(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<Json<PredictionResponse>> {
    let form = PredictForm::read(&mut multipart).await?;

    let coordinates = parse_coordinates(form.lat.as_deref(), form.lon.as_deref())
        .map_err(|m| AppError::InvalidCoordinates(m.to_string()))?;

    let Some((image_name, image)) = form.image.filter(|(_, bytes)| !bytes.is_empty()) else {
        return Err(AppError::Validation {
            field: "image".to_string(),
            message: "Image is required".to_string(),
        });
    };

    let language = Language::from_code(form.lang.as_deref().unwrap_or("en"));
    let place = form.location.filter(|p| !p.trim().is_empty());

    tracing::info!(
        image = %image_name,
        bytes = image.len(),
        lang = language.code(),
        has_coordinates = coordinates.is_some(),
        "Diagnosis requested"
    );

    let response = state
        .prediction
        .predict(PredictionRequest {
            image,
            image_name,
            language,
            coordinates,
            place,
        })
        .await?;

    Ok(Json(response))
}
