use crate::startup::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use serde_json::{json, Value};
use service_core::error::AppError;

/// Liveness probe. Never calls the provider.
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "gemini-relay",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Readiness probe: the provider must accept our credential.
pub async fn readiness_check(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    state.provider.health_check().await.map_err(|e| {
        tracing::warn!(error = %e, "Provider readiness check failed");
        AppError::ServiceUnavailable
    })?;

    Ok(Json(json!({ "status": "ready" })))
}
