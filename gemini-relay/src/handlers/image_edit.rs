use super::{image_response, json_rejection, upstream_error, MODEL_USED_HEADER};
use crate::dtos::ImageEditRequest;
use crate::services::{ingest, ImagePart, Part};
use crate::startup::AppState;
use axum::{
    extract::{multipart::MultipartRejection, rejection::JsonRejection, Multipart, State},
    http::HeaderValue,
    response::Response,
    Json,
};
use service_core::error::AppError;
use validator::Validate;

/// Single-model edit of a base64 image sent as JSON.
#[tracing::instrument(skip(state, payload))]
pub async fn edit_image(
    State(state): State<AppState>,
    payload: Result<Json<ImageEditRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(request) = payload.map_err(json_rejection)?;
    request.validate()?;

    let image = request
        .image
        .as_ref()
        .filter(|image| image.is_present())
        .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("Missing image")))?
        .decode()
        .map_err(|e| AppError::MalformedRequest(format!("Image data is not valid base64: {}", e)))?;
    if image.data.is_empty() {
        return Err(AppError::BadRequest(anyhow::anyhow!("Missing image")));
    }

    let model = &state.config.models.image_edit_model;
    let content = state
        .provider
        .generate_content(
            model,
            &[Part::Text(request.instruction), Part::InlineData(image)],
        )
        .await
        .map_err(|e| upstream_error(model, e))?;

    let image = content.first_image().ok_or_else(|| {
        tracing::warn!(model = %model, "Model answered without an image");
        AppError::NoImageReturned(
            "No image returned by this model/account. Try a different Gemini model tier."
                .to_string(),
        )
    })?;

    Ok(image_response(image))
}

/// Multipart edit that walks the candidate model list until one succeeds.
#[tracing::instrument(skip(state, multipart))]
pub async fn edit_image_multipart(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, AppError> {
    let multipart = multipart.map_err(|e| AppError::MalformedRequest(e.body_text()))?;
    let upload = ingest(multipart, &state.limits).await?;

    if upload.instruction.trim().is_empty() {
        return Err(AppError::BadRequest(anyhow::anyhow!("Missing instruction")));
    }
    if upload.file.is_empty() {
        return Err(AppError::BadRequest(anyhow::anyhow!("Missing image file")));
    }

    tracing::info!(
        file_name = ?upload.file_name,
        mime_type = %upload.mime_type,
        bytes = upload.file.len(),
        "Image edit upload received"
    );

    let image = ImagePart::new(upload.mime_type, upload.file);
    let attempt = state.fallback.edit_image(&upload.instruction, &image).await?;

    let mut response = image_response(attempt.image);
    if let Ok(value) = HeaderValue::from_str(&attempt.model) {
        response.headers_mut().insert(MODEL_USED_HEADER, value);
    }
    Ok(response)
}
