//! API route handlers
//!
//! - `health`: liveness, model information and Prometheus metrics
//! - `embed`: text embeddings (list, single, chunked batch)
//! - `similarity`: ranking from texts or from caller-supplied vectors
//! - `content`: topic relevance filtering and clustering

pub mod content;
pub mod embed;
pub mod health;
pub mod similarity;

use crate::error::{ServerError, ServerResult};
use crate::state::ServerState;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use embedding_api::PipelineError;
use serde_json::{json, Value};
use std::sync::Arc;

/// Unwrap a JSON body, turning extractor rejections into `BAD_REQUEST`.
pub(crate) fn json_body(payload: Result<Json<Value>, JsonRejection>) -> ServerResult<Value> {
    let Json(value) = payload?;
    Ok(value)
}

/// Run encoder-bound work off the async executor.
pub(crate) async fn run_blocking<T, F>(work: F) -> ServerResult<T>
where
    F: FnOnce() -> Result<T, PipelineError> + Send + 'static,
    T: Send + 'static,
{
    Ok(tokio::task::spawn_blocking(work).await??)
}

/// Service info and endpoint catalogue
///
/// ```json
/// {
///   "message": "Embedding API is running",
///   "version": "0.1.0",
///   "model": "all-MiniLM-L6-v2",
///   "endpoints": { "/embed": { "method": "POST", "...": "..." } }
/// }
/// ```
pub async fn api_info(State(state): State<Arc<ServerState>>) -> ServerResult<impl IntoResponse> {
    Ok(Json(json!({
        "message": "Embedding API is running",
        "version": env!("CARGO_PKG_VERSION"),
        "model": state.encoder().model_name(),
        "endpoints": {
            "/embed": {
                "method": "POST",
                "description": "Generate embeddings for a list of texts",
                "body": r#"{"texts": ["text1", "text2"], "normalize": true}"#
            },
            "/embed/single": {
                "method": "POST",
                "description": "Generate embedding for a single text",
                "body": r#"{"text": "your text", "normalize": true}"#
            },
            "/embed/batch": {
                "method": "POST",
                "description": "Generate embeddings for large batches with chunking",
                "body": r#"{"texts": [...], "batch_size": 32, "normalize": true}"#
            },
            "/similarity": {
                "method": "POST",
                "description": "Rank documents against a query",
                "body": r#"{"query": "...", "documents": [...], "top_k": 5}"#
            },
            "/similarity/embeddings": {
                "method": "POST",
                "description": "Rank pre-computed embeddings against a query embedding",
                "body": r#"{"query_embedding": [...], "document_embeddings": [[...]], "top_k": 5}"#
            },
            "/find-relevant-content": {
                "method": "POST",
                "description": "Find documents relevant to each topic",
                "body": r#"{"topics": [...], "documents": [...], "top_k": 10}"#
            },
            "/cluster-content": {
                "method": "POST",
                "description": "Group similar documents",
                "body": r#"{"documents": [...], "num_clusters": 5}"#
            },
            "/model/info": {
                "method": "GET",
                "description": "Model information and known models"
            },
            "/health": {
                "method": "GET",
                "description": "Health check"
            },
            "/metrics": {
                "method": "GET",
                "description": "Prometheus metrics"
            }
        }
    })))
}

/// 404 Not Found handler
pub async fn not_found() -> ServerError {
    ServerError::NotFound
}
