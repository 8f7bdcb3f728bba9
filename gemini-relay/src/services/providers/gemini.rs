//! Gemini AI provider implementation.
//!
//! Calls the `generateContent` method of Google's Generative Language API.
//! Inline data travels base64-encoded on the wire and as raw bytes in
//! [`ImagePart`].

use super::{ContentProvider, GeneratedContent, ImagePart, Part, ProviderError};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Gemini API base URL.
pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Gemini provider configuration.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: SecretString,
    pub base_url: String,
    pub timeout: Duration,
}

/// Gemini content provider.
pub struct GeminiProvider {
    config: GeminiConfig,
    client: Client,
}

impl GeminiProvider {
    pub fn new(config: GeminiConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                ProviderError::NotConfigured(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { config, client })
    }

    /// Build the API URL for the given model and method.
    fn api_url(&self, model: &str, method: &str) -> String {
        format!(
            "{}/models/{}:{}",
            self.config.base_url.trim_end_matches('/'),
            model,
            method
        )
    }

    fn to_wire_parts(parts: &[Part]) -> Vec<WirePart> {
        parts
            .iter()
            .map(|part| match part {
                Part::Text(text) => WirePart {
                    text: Some(text.clone()),
                    inline_data: None,
                },
                Part::InlineData(image) => WirePart {
                    text: None,
                    inline_data: Some(InlineData {
                        mime_type: image.mime_type.clone(),
                        data: STANDARD.encode(&image.data),
                    }),
                },
            })
            .collect()
    }

    fn from_wire_parts(parts: Vec<WirePart>) -> Result<Vec<Part>, ProviderError> {
        let mut out = Vec::with_capacity(parts.len());
        for part in parts {
            if let Some(inline) = part.inline_data {
                let data = STANDARD.decode(inline.data.as_bytes()).map_err(|e| {
                    ProviderError::InvalidResponse(format!("Inline data is not base64: {}", e))
                })?;
                out.push(Part::InlineData(ImagePart::new(inline.mime_type, data)));
            } else if let Some(text) = part.text {
                out.push(Part::Text(text));
            }
        }
        Ok(out)
    }

    /// Turn a non-2xx response into a [`ProviderError`], preferring the
    /// message from the API's error envelope.
    async fn error_from_response(response: reqwest::Response) -> ProviderError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        let message = serde_json::from_str::<ErrorEnvelope>(&body)
            .ok()
            .and_then(|e| e.error.message)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| format!("Gemini API error {}: {}", status, body));

        if status.as_u16() == 429 {
            ProviderError::RateLimited(message)
        } else {
            ProviderError::ApiError {
                status: status.as_u16(),
                message,
            }
        }
    }
}

#[async_trait]
impl ContentProvider for GeminiProvider {
    async fn generate_content(
        &self,
        model: &str,
        parts: &[Part],
    ) -> Result<GeneratedContent, ProviderError> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: Self::to_wire_parts(parts),
            }],
        };

        tracing::debug!(
            model = %model,
            part_count = parts.len(),
            "Sending request to Gemini API"
        );

        let response = self
            .client
            .post(self.api_url(model, "generateContent"))
            .header(API_KEY_HEADER, self.config.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::NetworkError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let api_response: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        if let Some(reason) = api_response
            .prompt_feedback
            .and_then(|f| f.block_reason)
        {
            return Err(ProviderError::ContentFiltered(format!(
                "Prompt blocked: {}",
                reason
            )));
        }

        let Some(candidate) = api_response.candidates.into_iter().next() else {
            return Ok(GeneratedContent::default());
        };

        if candidate.finish_reason.as_deref() == Some("SAFETY") {
            return Err(ProviderError::ContentFiltered(
                "Response blocked for safety reasons".to_string(),
            ));
        }

        let parts = candidate.content.map(|c| c.parts).unwrap_or_default();
        Ok(GeneratedContent::new(Self::from_wire_parts(parts)?))
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        if self.config.api_key.expose_secret().is_empty() {
            return Err(ProviderError::NotConfigured(
                "Gemini API key not configured".to_string(),
            ));
        }

        let url = format!("{}/models", self.config.base_url.trim_end_matches('/'));

        let response = self
            .client
            .get(&url)
            .header(API_KEY_HEADER, self.config.api_key.expose_secret())
            .send()
            .await
            .map_err(|e| ProviderError::NetworkError(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::error_from_response(response).await)
        }
    }
}

// ============================================================================
// Gemini API Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<WirePart>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    #[serde(default)]
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(base_url: &str) -> GeminiProvider {
        GeminiProvider::new(GeminiConfig {
            api_key: SecretString::new("test-key".to_string()),
            base_url: base_url.to_string(),
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[test]
    fn api_url_targets_model_method() {
        let p = provider("http://localhost:1234/v1beta/");
        assert_eq!(
            p.api_url("gemini-1.5-flash", "generateContent"),
            "http://localhost:1234/v1beta/models/gemini-1.5-flash:generateContent"
        );
    }

    #[test]
    fn request_parts_serialize_in_camel_case() {
        let parts = GeminiProvider::to_wire_parts(&[
            Part::Text("make it blue".into()),
            Part::InlineData(ImagePart::new("image/png", vec![1, 2, 3])),
        ]);
        let json = serde_json::to_value(&parts).unwrap();

        assert_eq!(json[0], serde_json::json!({ "text": "make it blue" }));
        assert_eq!(
            json[1],
            serde_json::json!({ "inlineData": { "mimeType": "image/png", "data": "AQID" } })
        );
    }

    #[test]
    fn response_parts_decode_inline_data() {
        let wire: Vec<WirePart> = serde_json::from_value(serde_json::json!([
            { "text": "done" },
            { "inlineData": { "mimeType": "image/jpeg", "data": "AQID" } }
        ]))
        .unwrap();

        let parts = GeminiProvider::from_wire_parts(wire).unwrap();
        assert_eq!(
            parts,
            vec![
                Part::Text("done".into()),
                Part::InlineData(ImagePart::new("image/jpeg", vec![1, 2, 3])),
            ]
        );
    }

    #[test]
    fn response_with_bad_base64_is_invalid() {
        let wire: Vec<WirePart> = serde_json::from_value(serde_json::json!([
            { "inlineData": { "mimeType": "image/png", "data": "***" } }
        ]))
        .unwrap();

        assert!(matches!(
            GeminiProvider::from_wire_parts(wire),
            Err(ProviderError::InvalidResponse(_))
        ));
    }
}
