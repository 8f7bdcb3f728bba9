#![allow(dead_code)]

use axum::body::Body;
use axum::http::Response;
use axum::Router;
use gemini_relay::config::{GoogleConfig, ModelConfig, RelayConfig, UploadConfig};
use gemini_relay::services::providers::mock::MockProvider;
use gemini_relay::startup::{build_router, AppState, Application};
use secrecy::SecretString;
use service_core::config::Config as CoreConfig;
use std::sync::Arc;
use std::time::Duration;

pub const TEXT_MODEL: &str = "text-model";
pub const EDIT_MODEL: &str = "edit-model";
pub const CANDIDATES: [&str; 3] = ["candidate-a", "candidate-b", "candidate-c"];

/// Smallest valid PNG signature plus a few payload bytes.
pub const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 1, 2, 3, 4];

pub fn test_config() -> RelayConfig {
    RelayConfig {
        common: CoreConfig {
            port: 0, // Random port for testing
            log_level: "debug".to_string(),
            otlp_endpoint: None,
        },
        google: GoogleConfig {
            api_key: SecretString::new("test-api-key".to_string()),
            api_base: "http://127.0.0.1:9".to_string(),
            request_timeout: Duration::from_secs(5),
        },
        models: ModelConfig {
            text_model: TEXT_MODEL.to_string(),
            image_edit_model: EDIT_MODEL.to_string(),
            image_edit_candidates: CANDIDATES.iter().map(|m| m.to_string()).collect(),
        },
        upload: UploadConfig {
            max_bytes: 1024,
            allowed_mime_types: vec![
                "image/png".to_string(),
                "image/jpeg".to_string(),
                "image/webp".to_string(),
                "image/gif".to_string(),
            ],
            json_body_limit_bytes: 64 * 1024,
        },
    }
}

pub fn router_with(provider: Arc<MockProvider>) -> Router {
    build_router(AppState::new(test_config(), provider))
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body")
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).expect("Body is not JSON")
}

/// Spawn the relay on a random port and return its base address.
pub async fn spawn_app(config: RelayConfig, provider: Arc<MockProvider>) -> String {
    let app = Application::build_with_provider(config, provider)
        .await
        .expect("Failed to build application");
    let port = app.port();

    tokio::spawn(app.run_until_stopped());

    format!("http://127.0.0.1:{}", port)
}
