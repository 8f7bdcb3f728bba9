use super::{json_rejection, upstream_error};
use crate::dtos::{TextCompletionRequest, TextCompletionResponse};
use crate::services::Part;
use crate::startup::AppState;
use axum::{extract::rejection::JsonRejection, extract::State, Json};
use service_core::error::AppError;
use validator::Validate;

#[tracing::instrument(skip(state, payload))]
pub async fn text_completion(
    State(state): State<AppState>,
    payload: Result<Json<TextCompletionRequest>, JsonRejection>,
) -> Result<Json<TextCompletionResponse>, AppError> {
    let Json(request) = payload.map_err(json_rejection)?;
    request.validate()?;

    let model = &state.config.models.text_model;
    let content = state
        .provider
        .generate_content(model, &[Part::Text(request.prompt)])
        .await
        .map_err(|e| upstream_error(model, e))?;

    Ok(Json(TextCompletionResponse {
        text: content.text(),
    }))
}
