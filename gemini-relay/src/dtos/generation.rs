use crate::services::ImagePart;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Rejects empty and whitespace-only strings.
fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

/// `POST /api/gemini-text`
#[derive(Debug, Deserialize, Validate)]
pub struct TextCompletionRequest {
    #[serde(default)]
    #[validate(custom(function = "not_blank"))]
    pub prompt: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TextCompletionResponse {
    pub text: String,
}

/// `POST /api/gemini-image-edit`
#[derive(Debug, Deserialize, Validate)]
pub struct ImageEditRequest {
    #[serde(default)]
    #[validate(custom(function = "not_blank"))]
    pub instruction: String,
    #[serde(default)]
    pub image: Option<InlineImage>,
}

/// Image sent inline as base64 without a `data:` prefix.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineImage {
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub data: String,
}

impl InlineImage {
    pub fn is_present(&self) -> bool {
        !self.mime_type.is_empty() && !self.data.is_empty()
    }

    pub fn decode(&self) -> Result<ImagePart, base64::DecodeError> {
        let data = STANDARD.decode(self.data.trim().as_bytes())?;
        Ok(ImagePart::new(self.mime_type.clone(), data))
    }
}
