//! Mock provider implementation for testing.

use super::{ContentProvider, GeneratedContent, ImagePart, Part, ProviderError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// What the mock answers for a model.
#[derive(Debug, Clone)]
pub enum MockOutcome {
    /// Return the request's parts: text as "Mock response for: <text>",
    /// images unchanged.
    Echo,
    Text(String),
    Image(ImagePart),
    Fail(ProviderError),
}

/// Scripted provider that records every model it is asked for.
pub struct MockProvider {
    default: MockOutcome,
    per_model: HashMap<String, MockOutcome>,
    calls: Mutex<Vec<String>>,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            default: MockOutcome::Echo,
            per_model: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Outcome for any model without its own script.
    pub fn with_default(mut self, outcome: MockOutcome) -> Self {
        self.default = outcome;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>, outcome: MockOutcome) -> Self {
        self.per_model.insert(model.into(), outcome);
        self
    }

    /// Model ids in the order they were called.
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls().len()
    }

    fn echo(parts: &[Part]) -> GeneratedContent {
        GeneratedContent::new(
            parts
                .iter()
                .map(|p| match p {
                    Part::Text(text) => Part::Text(format!("Mock response for: {}", text)),
                    Part::InlineData(image) => Part::InlineData(image.clone()),
                })
                .collect(),
        )
    }
}

#[async_trait]
impl ContentProvider for MockProvider {
    async fn generate_content(
        &self,
        model: &str,
        parts: &[Part],
    ) -> Result<GeneratedContent, ProviderError> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(model.to_string());

        match self.per_model.get(model).unwrap_or(&self.default) {
            MockOutcome::Echo => Ok(Self::echo(parts)),
            MockOutcome::Text(text) => Ok(GeneratedContent::new(vec![Part::Text(text.clone())])),
            MockOutcome::Image(image) => Ok(GeneratedContent::new(vec![
                Part::Text("Here is the edited image".to_string()),
                Part::InlineData(image.clone()),
            ])),
            MockOutcome::Fail(err) => Err(err.clone()),
        }
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        Ok(())
    }
}
