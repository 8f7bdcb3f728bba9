//! Generative-AI provider abstractions and implementations.
//!
//! Handlers only see [`ContentProvider`], so the Gemini backend can be
//! swapped for the scripted [`mock::MockProvider`] in tests.

pub mod gemini;
pub mod mock;

use async_trait::async_trait;
use thiserror::Error;

/// Error type for provider operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("{message}")]
    ApiError { status: u16, message: String },

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Content filtered: {0}")]
    ContentFiltered(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Network error: {0}")]
    NetworkError(String),
}

/// A binary artifact with its declared MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePart {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl ImagePart {
    pub fn new(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data,
        }
    }
}

/// One fragment of a request or response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    Text(String),
    InlineData(ImagePart),
}

/// Parts returned by the first candidate of a generation call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratedContent {
    pub parts: Vec<Part>,
}

impl GeneratedContent {
    pub fn new(parts: Vec<Part>) -> Self {
        Self { parts }
    }

    /// All text parts joined, in order.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::Text(text) => Some(text.as_str()),
                Part::InlineData(_) => None,
            })
            .collect()
    }

    /// First part carrying inline binary data.
    pub fn first_image(self) -> Option<ImagePart> {
        self.parts.into_iter().find_map(|p| match p {
            Part::InlineData(image) if !image.data.is_empty() => Some(image),
            _ => None,
        })
    }
}

/// A generative model backend addressed by model identifier.
#[async_trait]
pub trait ContentProvider: Send + Sync {
    /// Run one generation call against `model` with the given user parts.
    async fn generate_content(
        &self,
        model: &str,
        parts: &[Part],
    ) -> Result<GeneratedContent, ProviderError>;

    /// Health check.
    async fn health_check(&self) -> Result<(), ProviderError>;
}
