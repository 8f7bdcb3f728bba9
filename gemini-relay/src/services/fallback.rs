//! Ordered model fallback for image edits.
//!
//! Candidates are tried one at a time in priority order. A provider error
//! moves on to the next candidate; a successful call that carries no image
//! ends the attempt immediately, since it means the model answered but
//! cannot produce images.

use super::providers::{ContentProvider, ImagePart, Part, ProviderError};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FallbackError {
    #[error("No candidate models configured")]
    NoCandidates,

    #[error("Model {model} returned no image")]
    NoImageReturned { model: String },

    #[error("{source}")]
    Upstream {
        model: String,
        #[source]
        source: ProviderError,
    },
}

/// The image produced and the model that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAttempt {
    pub model: String,
    pub image: ImagePart,
}

#[derive(Clone)]
pub struct ModelFallback {
    provider: Arc<dyn ContentProvider>,
    candidates: Vec<String>,
}

impl ModelFallback {
    pub fn new(provider: Arc<dyn ContentProvider>, candidates: Vec<String>) -> Self {
        Self {
            provider,
            candidates,
        }
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    pub async fn edit_image(
        &self,
        instruction: &str,
        image: &ImagePart,
    ) -> Result<ImageAttempt, FallbackError> {
        let parts = [
            Part::Text(instruction.to_string()),
            Part::InlineData(image.clone()),
        ];

        let mut last_error = None;

        for model in &self.candidates {
            match self.provider.generate_content(model, &parts).await {
                Ok(content) => {
                    let Some(image) = content.first_image() else {
                        tracing::warn!(model = %model, "Model answered without an image");
                        return Err(FallbackError::NoImageReturned {
                            model: model.clone(),
                        });
                    };

                    tracing::info!(
                        model = %model,
                        mime_type = %image.mime_type,
                        bytes = image.data.len(),
                        "Image edit succeeded"
                    );
                    return Ok(ImageAttempt {
                        model: model.clone(),
                        image,
                    });
                }
                Err(e) => {
                    tracing::warn!(model = %model, error = %e, "Model failed, trying next candidate");
                    last_error = Some(FallbackError::Upstream {
                        model: model.clone(),
                        source: e,
                    });
                }
            }
        }

        Err(last_error.unwrap_or(FallbackError::NoCandidates))
    }
}
