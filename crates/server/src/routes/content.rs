use super::{json_body, run_blocking};
use crate::error::ServerResult;
use crate::state::ServerState;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use embedding_api::validate::{ClusterRequest, RelevantContentRequest};
use embedding_api::{Cluster, TopicMatches};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct RelevantContentResponse {
    pub relevant_content: Vec<TopicMatches>,
    pub model: String,
    pub total_topics: usize,
    pub total_documents: usize,
}

#[derive(Debug, Serialize)]
pub struct ClusterResponse {
    pub clusters: Vec<Cluster>,
    pub num_clusters: usize,
    pub total_documents: usize,
}

/// `POST /find-relevant-content`
///
/// Per topic, documents scoring above the configured relevance threshold.
pub async fn find_relevant_content(
    State(state): State<Arc<ServerState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ServerResult<impl IntoResponse> {
    let request = RelevantContentRequest::from_payload(&json_body(payload)?)?;
    let total_topics = request.topics.len();
    let total_documents = request.documents.len();

    let pipeline = state.pipeline.clone();
    let relevant_content = run_blocking(move || {
        pipeline.find_relevant(&request.topics, &request.documents, request.top_k)
    })
    .await?;

    Ok(Json(RelevantContentResponse {
        relevant_content,
        model: state.encoder().model_name().to_string(),
        total_topics,
        total_documents,
    }))
}

/// `POST /cluster-content`
pub async fn cluster_content(
    State(state): State<Arc<ServerState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ServerResult<impl IntoResponse> {
    let request = ClusterRequest::from_payload(&json_body(payload)?)?;
    let total_documents = request.documents.len();

    let pipeline = state.pipeline.clone();
    let out = run_blocking(move || pipeline.cluster(&request.documents, request.num_clusters))
        .await?;

    Ok(Json(ClusterResponse {
        clusters: out.clusters,
        num_clusters: out.num_clusters,
        total_documents,
    }))
}
