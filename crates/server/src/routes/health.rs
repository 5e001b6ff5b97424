use crate::error::{ServerError, ServerResult};
use crate::state::ServerState;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use axum::Json;
use semantic::KNOWN_MODELS;
use serde_json::json;
use std::sync::Arc;

/// Health check endpoint (liveness)
///
/// Still answers 200 when serving stub vectors in place of the configured
/// model, but reports `degraded` with `model_loaded: false`.
pub async fn health_check(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    let encoder = state.encoder();
    let fallback = encoder.is_fallback();
    Json(json!({
        "status": if fallback { "degraded" } else { "healthy" },
        "model": encoder.model_name(),
        "embedding_dimension": encoder.embedding_dimension(),
        "model_loaded": !fallback,
        "max_seq_length": encoder.max_seq_length(),
        "clustering_available": state.pipeline.clustering_available(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime_seconds": state.uptime_seconds(),
    }))
}

/// Loaded model details plus the catalogue of known models
pub async fn model_info(State(state): State<Arc<ServerState>>) -> ServerResult<impl IntoResponse> {
    let encoder = state.encoder();
    Ok(Json(json!({
        "model_name": encoder.model_name(),
        "embedding_dimension": encoder.embedding_dimension(),
        "max_seq_length": encoder.max_seq_length(),
        "fallback": encoder.is_fallback(),
        "available_models": KNOWN_MODELS,
    })))
}

/// Prometheus metrics endpoint
pub async fn metrics(State(state): State<Arc<ServerState>>) -> ServerResult<impl IntoResponse> {
    if !state.config.metrics_enabled {
        return Err(ServerError::NotFound);
    }
    let body = state
        .prometheus
        .as_ref()
        .map(|handle| handle.render())
        .unwrap_or_default();
    Ok(([(CONTENT_TYPE, "text/plain; version=0.0.4")], body))
}
