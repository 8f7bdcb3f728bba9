//! Application startup and lifecycle management.

use crate::config::RelayConfig;
use crate::handlers;
use crate::services::providers::gemini::{GeminiConfig, GeminiProvider};
use crate::services::{ContentProvider, ModelFallback, MultipartLimits};
use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::request_id_middleware;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Room for multipart framing and the text fields on top of the file limit.
const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: RelayConfig,
    pub provider: Arc<dyn ContentProvider>,
    pub fallback: ModelFallback,
    pub limits: MultipartLimits,
}

impl AppState {
    pub fn new(config: RelayConfig, provider: Arc<dyn ContentProvider>) -> Self {
        let fallback = ModelFallback::new(
            provider.clone(),
            config.models.image_edit_candidates.clone(),
        );
        let limits = config.upload.limits();

        Self {
            config,
            provider,
            fallback,
            limits,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let json_limit = state.config.upload.json_body_limit_bytes;
    let multipart_limit = usize::try_from(state.config.upload.max_bytes)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route(
            "/api/gemini-text",
            post(handlers::text_completion)
                .fallback(handlers::use_post)
                .layer(DefaultBodyLimit::max(json_limit)),
        )
        .route(
            "/api/gemini-image-edit",
            post(handlers::edit_image)
                .fallback(handlers::use_post)
                .layer(DefaultBodyLimit::max(json_limit)),
        )
        .route(
            "/api/gemini-image-edit-multipart",
            post(handlers::edit_image_multipart)
                .fallback(handlers::use_post)
                .layer(DefaultBodyLimit::max(multipart_limit)),
        )
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application against the Gemini API.
    pub async fn build(config: RelayConfig) -> Result<Self, AppError> {
        let provider = GeminiProvider::new(GeminiConfig {
            api_key: config.google.api_key.clone(),
            base_url: config.google.api_base.clone(),
            timeout: config.google.request_timeout,
        })
        .map_err(|e| AppError::ConfigError(anyhow::Error::new(e)))?;

        tracing::info!(
            text_model = %config.models.text_model,
            image_edit_model = %config.models.image_edit_model,
            candidates = ?config.models.image_edit_candidates,
            "Initialized Gemini provider"
        );

        Self::build_with_provider(config, Arc::new(provider)).await
    }

    /// Build the application with any provider (tests pass a mock).
    pub async fn build_with_provider(
        config: RelayConfig,
        provider: Arc<dyn ContentProvider>,
    ) -> Result<Self, AppError> {
        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let router = build_router(AppState::new(config, provider));

        // Port 0 binds a random port for testing
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Listening on {}", port);

        Ok(Self {
            port,
            listener,
            router,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        axum::serve(self.listener, self.router).await
    }

    pub async fn run_with_graceful_shutdown<F>(self, signal: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(signal)
            .await
    }
}
