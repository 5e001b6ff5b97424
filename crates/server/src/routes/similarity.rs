use super::{json_body, run_blocking};
use crate::error::ServerResult;
use crate::state::ServerState;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use embedding_api::validate::{EmbeddingSimilarityRequest, SimilarityRequest};
use embedding_api::ScoredResult;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct DocumentScore {
    pub document: String,
    pub index: usize,
    pub score: f64,
}

#[derive(Debug, Serialize)]
pub struct SimilarityResponse {
    pub results: Vec<DocumentScore>,
    pub query: String,
    pub model: String,
    pub total_documents: usize,
    pub top_k: usize,
}

#[derive(Debug, Serialize)]
pub struct EmbeddingSimilarityResponse {
    pub results: Vec<ScoredResult>,
    pub total_documents: usize,
    pub top_k: usize,
}

/// `POST /similarity`
///
/// Encodes the query and documents (normalized) and ranks by cosine similarity.
pub async fn similarity(
    State(state): State<Arc<ServerState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ServerResult<impl IntoResponse> {
    let request = SimilarityRequest::from_payload(&json_body(payload)?)?;
    let total_documents = request.documents.len();
    let query = request.query.clone();

    let pipeline = state.pipeline.clone();
    let ranked = run_blocking(move || {
        pipeline.similarity(&request.query, &request.documents, request.top_k)
    })
    .await?;

    let top_k = ranked.len();
    let results = ranked
        .into_iter()
        .map(|r| DocumentScore {
            document: r.text.unwrap_or_default(),
            index: r.index,
            score: r.score,
        })
        .collect();

    Ok(Json(SimilarityResponse {
        results,
        query,
        model: state.encoder().model_name().to_string(),
        total_documents,
        top_k,
    }))
}

/// `POST /similarity/embeddings`
///
/// Ranks caller-supplied vectors; the encoder is not involved.
pub async fn similarity_embeddings(
    State(state): State<Arc<ServerState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ServerResult<impl IntoResponse> {
    let request = EmbeddingSimilarityRequest::from_payload(&json_body(payload)?)?;
    let total_documents = request.document_embeddings.len();

    let results = state.pipeline.similarity_from_embeddings(
        &request.query_embedding,
        &request.document_embeddings,
        request.top_k,
    )?;

    Ok(Json(EmbeddingSimilarityResponse {
        top_k: results.len(),
        results,
        total_documents,
    }))
}
