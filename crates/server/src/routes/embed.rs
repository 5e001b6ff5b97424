use super::{json_body, run_blocking};
use crate::error::ServerResult;
use crate::state::ServerState;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use embedding_api::validate::{BatchEmbedRequest, EmbedRequest, SingleEmbedRequest};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct EmbedResponse {
    pub embeddings: Vec<Vec<f32>>,
    pub model: String,
    pub num_texts: usize,
    pub embedding_dimension: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batches_processed: Option<usize>,
    pub normalized: bool,
}

#[derive(Debug, Serialize)]
pub struct SingleEmbedResponse {
    pub embedding: Vec<f32>,
    pub model: String,
    pub embedding_dimension: usize,
    pub normalized: bool,
}

/// `POST /embed`
pub async fn embed(
    State(state): State<Arc<ServerState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ServerResult<impl IntoResponse> {
    let request = EmbedRequest::from_payload(&json_body(payload)?)?;
    let num_texts = request.texts.len();
    let normalize = request.normalize;

    let pipeline = state.pipeline.clone();
    let out = run_blocking(move || pipeline.embed(&request.texts, normalize)).await?;

    Ok(Json(EmbedResponse {
        embedding_dimension: out.embedding_dimension(),
        embeddings: out.vectors,
        model: state.encoder().model_name().to_string(),
        num_texts,
        batches_processed: None,
        normalized: normalize,
    }))
}

/// `POST /embed/single`
pub async fn embed_single(
    State(state): State<Arc<ServerState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ServerResult<impl IntoResponse> {
    let request = SingleEmbedRequest::from_payload(&json_body(payload)?)?;
    let normalize = request.normalize;

    let pipeline = state.pipeline.clone();
    let embedding = run_blocking(move || pipeline.embed_single(&request.text, normalize)).await?;

    Ok(Json(SingleEmbedResponse {
        embedding_dimension: embedding.len(),
        embedding,
        model: state.encoder().model_name().to_string(),
        normalized: normalize,
    }))
}

/// `POST /embed/batch`
pub async fn embed_batch(
    State(state): State<Arc<ServerState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ServerResult<impl IntoResponse> {
    let request = BatchEmbedRequest::from_payload(&json_body(payload)?)?;
    let num_texts = request.texts.len();
    let normalize = request.normalize;

    let pipeline = state.pipeline.clone();
    let out = run_blocking(move || {
        pipeline.embed_batch(&request.texts, request.batch_size, normalize)
    })
    .await?;

    tracing::debug!(
        texts = num_texts,
        batches = out.chunks_processed,
        "batch embedding complete"
    );

    Ok(Json(EmbedResponse {
        embedding_dimension: out.embedding_dimension(),
        embeddings: out.vectors,
        model: state.encoder().model_name().to_string(),
        num_texts,
        batches_processed: Some(out.chunks_processed),
        normalized: normalize,
    }))
}
