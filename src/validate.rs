//! Request validation over decoded JSON payloads.
//!
//! Each request type is built with `from_payload`, which checks presence, type,
//! and non-degeneracy of every field before any encoding happens. Validators
//! only read the payload. Errors name the offending field, using `texts[3]`
//! style paths for list items.
//!
//! Payloads are walked as `serde_json::Value` rather than derived request
//! structs because serde's errors cannot name the failing list index.

use serde_json::{Map, Value};

use crate::PipelineError;

type Payload = Map<String, Value>;

fn as_object(body: &Value) -> Result<&Payload, PipelineError> {
    body.as_object()
        .ok_or_else(|| PipelineError::validation("body", "request body must be a JSON object"))
}

/// Absent and explicit `null` are treated alike.
fn lookup<'a>(payload: &'a Payload, field: &str) -> Option<&'a Value> {
    payload.get(field).filter(|v| !v.is_null())
}

fn require<'a>(payload: &'a Payload, field: &str) -> Result<&'a Value, PipelineError> {
    lookup(payload, field)
        .ok_or_else(|| PipelineError::validation(field, "missing in request body"))
}

/// A non-empty string after trimming.
pub fn required_text(payload: &Payload, field: &str) -> Result<String, PipelineError> {
    let value = require(payload, field)?;
    let text = value
        .as_str()
        .ok_or_else(|| PipelineError::validation(field, "must be a string"))?;
    if text.trim().is_empty() {
        return Err(PipelineError::validation(
            field,
            "must be a non-empty string",
        ));
    }
    Ok(text.to_owned())
}

/// A non-empty list of strings, each non-empty after trimming.
pub fn required_text_list(payload: &Payload, field: &str) -> Result<Vec<String>, PipelineError> {
    let items = require(payload, field)?
        .as_array()
        .ok_or_else(|| PipelineError::validation(field, "must be a non-empty list"))?;
    if items.is_empty() {
        return Err(PipelineError::validation(field, "must be a non-empty list"));
    }
    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let text = item.as_str().ok_or_else(|| {
                PipelineError::validation(format!("{field}[{i}]"), "must be a string")
            })?;
            if text.trim().is_empty() {
                return Err(PipelineError::validation(
                    format!("{field}[{i}]"),
                    "must not be empty or whitespace-only",
                ));
            }
            Ok(text.to_owned())
        })
        .collect()
}

pub fn optional_bool(payload: &Payload, field: &str, default: bool) -> Result<bool, PipelineError> {
    match lookup(payload, field) {
        None => Ok(default),
        Some(value) => value
            .as_bool()
            .ok_or_else(|| PipelineError::validation(field, "must be a boolean")),
    }
}

/// An optional integer >= 1. Range checks against input sizes happen in the components.
pub fn optional_positive(payload: &Payload, field: &str) -> Result<Option<usize>, PipelineError> {
    let Some(value) = lookup(payload, field) else {
        return Ok(None);
    };
    match value.as_u64() {
        Some(n) if n >= 1 => usize::try_from(n)
            .map(Some)
            .map_err(|_| PipelineError::validation(field, "is too large")),
        _ => Err(PipelineError::validation(
            field,
            "must be a positive integer",
        )),
    }
}

fn number_list(value: &Value, field: &str) -> Result<Vec<f32>, PipelineError> {
    let items = value
        .as_array()
        .ok_or_else(|| PipelineError::validation(field, "must be a list of numbers"))?;
    if items.is_empty() {
        return Err(PipelineError::validation(field, "must not be empty"));
    }
    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let x = item.as_f64().map(|x| x as f32).filter(|x| x.is_finite());
            x.ok_or_else(|| {
                PipelineError::validation(format!("{field}[{i}]"), "must be a finite number")
            })
        })
        .collect()
}

/// A non-empty vector of finite numbers with non-zero magnitude.
pub fn required_vector(payload: &Payload, field: &str) -> Result<Vec<f32>, PipelineError> {
    let vector = number_list(require(payload, field)?, field)?;
    if vector.iter().all(|&x| x == 0.0) {
        return Err(PipelineError::validation(
            field,
            "must have non-zero magnitude",
        ));
    }
    Ok(vector)
}

/// A non-empty list of non-empty numeric vectors. Lengths are not compared here.
pub fn required_vector_list(payload: &Payload, field: &str) -> Result<Vec<Vec<f32>>, PipelineError> {
    let rows = require(payload, field)?
        .as_array()
        .ok_or_else(|| PipelineError::validation(field, "must be a non-empty list of vectors"))?;
    if rows.is_empty() {
        return Err(PipelineError::validation(
            field,
            "must be a non-empty list of vectors",
        ));
    }
    rows.iter()
        .enumerate()
        .map(|(i, row)| number_list(row, &format!("{field}[{i}]")))
        .collect()
}

/// `POST /embed`
#[derive(Debug, Clone, PartialEq)]
pub struct EmbedRequest {
    pub texts: Vec<String>,
    pub normalize: bool,
}

impl EmbedRequest {
    pub fn from_payload(body: &Value) -> Result<Self, PipelineError> {
        let payload = as_object(body)?;
        Ok(Self {
            texts: required_text_list(payload, "texts")?,
            normalize: optional_bool(payload, "normalize", true)?,
        })
    }
}

/// `POST /embed/single`
#[derive(Debug, Clone, PartialEq)]
pub struct SingleEmbedRequest {
    pub text: String,
    pub normalize: bool,
}

impl SingleEmbedRequest {
    pub fn from_payload(body: &Value) -> Result<Self, PipelineError> {
        let payload = as_object(body)?;
        Ok(Self {
            text: required_text(payload, "text")?,
            normalize: optional_bool(payload, "normalize", true)?,
        })
    }
}

/// `POST /embed/batch`
#[derive(Debug, Clone, PartialEq)]
pub struct BatchEmbedRequest {
    pub texts: Vec<String>,
    pub batch_size: Option<usize>,
    pub normalize: bool,
}

impl BatchEmbedRequest {
    pub fn from_payload(body: &Value) -> Result<Self, PipelineError> {
        let payload = as_object(body)?;
        Ok(Self {
            texts: required_text_list(payload, "texts")?,
            batch_size: optional_positive(payload, "batch_size")?,
            normalize: optional_bool(payload, "normalize", true)?,
        })
    }
}

/// `POST /similarity`
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityRequest {
    pub query: String,
    pub documents: Vec<String>,
    pub top_k: Option<usize>,
}

impl SimilarityRequest {
    pub fn from_payload(body: &Value) -> Result<Self, PipelineError> {
        let payload = as_object(body)?;
        Ok(Self {
            query: required_text(payload, "query")?,
            documents: required_text_list(payload, "documents")?,
            top_k: optional_positive(payload, "top_k")?,
        })
    }
}

/// `POST /similarity/embeddings`
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingSimilarityRequest {
    pub query_embedding: Vec<f32>,
    pub document_embeddings: Vec<Vec<f32>>,
    pub top_k: Option<usize>,
}

impl EmbeddingSimilarityRequest {
    pub fn from_payload(body: &Value) -> Result<Self, PipelineError> {
        let payload = as_object(body)?;
        Ok(Self {
            query_embedding: required_vector(payload, "query_embedding")?,
            document_embeddings: required_vector_list(payload, "document_embeddings")?,
            top_k: optional_positive(payload, "top_k")?,
        })
    }
}

/// `POST /find-relevant-content`
#[derive(Debug, Clone, PartialEq)]
pub struct RelevantContentRequest {
    pub topics: Vec<String>,
    pub documents: Vec<String>,
    pub top_k: Option<usize>,
}

impl RelevantContentRequest {
    pub fn from_payload(body: &Value) -> Result<Self, PipelineError> {
        let payload = as_object(body)?;
        Ok(Self {
            topics: required_text_list(payload, "topics")?,
            documents: required_text_list(payload, "documents")?,
            top_k: optional_positive(payload, "top_k")?,
        })
    }
}

/// `POST /cluster-content`
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterRequest {
    pub documents: Vec<String>,
    pub num_clusters: Option<usize>,
}

impl ClusterRequest {
    pub fn from_payload(body: &Value) -> Result<Self, PipelineError> {
        let payload = as_object(body)?;
        Ok(Self {
            documents: required_text_list(payload, "documents")?,
            num_clusters: optional_positive(payload, "num_clusters")?,
        })
    }
}
