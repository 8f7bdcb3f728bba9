//! HTTP handlers for the relay endpoints.

pub mod health;
pub mod image_edit;
pub mod text;

pub use health::{health_check, readiness_check};
pub use image_edit::{edit_image, edit_image_multipart};
pub use text::text_completion;

use crate::services::{FallbackError, ImagePart, IngestError, ProviderError};
use axum::{
    extract::rejection::JsonRejection,
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
};
use service_core::error::AppError;

/// Content type used when the model does not declare one.
pub const DEFAULT_IMAGE_MIME_TYPE: &str = "image/png";

/// Header naming the candidate that produced the image.
pub const MODEL_USED_HEADER: &str = "x-model-used";

/// Fallback for every non-POST method on the relay routes.
pub async fn use_post() -> AppError {
    AppError::MethodNotAllowed
}

fn json_rejection(rejection: JsonRejection) -> AppError {
    AppError::MalformedRequest(rejection.body_text())
}

/// Log an upstream failure and surface its message to the caller.
fn upstream_error(model: &str, err: ProviderError) -> AppError {
    tracing::error!(model = %model, error = %err, "Upstream generation failed");
    AppError::UpstreamError(err.to_string())
}

/// Raw image bytes with the artifact's content type.
fn image_response(image: ImagePart) -> Response {
    let content_type = if image.mime_type.is_empty() {
        HeaderValue::from_static(DEFAULT_IMAGE_MIME_TYPE)
    } else {
        HeaderValue::from_str(&image.mime_type)
            .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_IMAGE_MIME_TYPE))
    };

    (
        [
            (header::CONTENT_TYPE, content_type),
            (header::CACHE_CONTROL, HeaderValue::from_static("no-store")),
        ],
        image.data,
    )
        .into_response()
}

impl From<IngestError> for AppError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::UnsupportedMediaType(mime) => AppError::UnsupportedMediaType(mime),
            IngestError::PayloadTooLarge { limit } => AppError::PayloadTooLarge(limit),
            IngestError::Malformed(reason) => AppError::MalformedRequest(reason),
        }
    }
}

impl From<FallbackError> for AppError {
    fn from(err: FallbackError) -> Self {
        match err {
            FallbackError::NoCandidates => {
                AppError::ConfigError(anyhow::anyhow!("No image edit models configured"))
            }
            FallbackError::NoImageReturned { model } => AppError::NoImageReturned(format!(
                "No image returned by model {}. Try a different Gemini model tier.",
                model
            )),
            FallbackError::Upstream { model, source } => upstream_error(&model, source),
        }
    }
}
