use crate::error::ApiError;
use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::response::Html;
use factcheck_llm::verifier::VerificationRequest;
use serde_json::{Value, json};

pub async fn index(State(state): State<AppState>) -> Html<String> {
    Html(state.index_html.to_string())
}

/// Models the configured key can use for `generateContent`.
pub async fn list_models(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let models = state.catalog.generation_models().await.map_err(|e| {
        tracing::warn!(error = %e, "model listing failed");
        ApiError::listing(e)
    })?;
    tracing::debug!(count = models.len(), "listed generation models");

    Ok(Json(json!({
        "success": true,
        "models": models,
    })))
}

pub async fn verify(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(body) = payload?;
    let request = VerificationRequest::from_json(&body)?;

    let verification = state.verifier.verify(&request).await.map_err(|e| {
        tracing::warn!(error = %e, "verification failed");
        e
    })?;

    tracing::info!(
        model = %verification.model_used,
        is_correct = verification.result.is_correct,
        confidence = verification.result.confidence,
        degraded = verification.degraded,
        input_chars = request.input().chars().count(),
        "verification served"
    );

    Ok(Json(json!({
        "success": true,
        "result": verification.result,
        "model_used": verification.model_used,
    })))
}
