use semantic::SemanticError;
use thiserror::Error;

/// Failure kinds surfaced by every pipeline component.
///
/// Components return these immediately; nothing is logged-and-continued and
/// partial results are never returned as if complete.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Malformed or missing input. Report it; retrying will not help.
    #[error("invalid field `{field}`: {message}")]
    Validation { field: String, message: String },

    /// A document vector's length differs from the query vector's.
    #[error("dimension mismatch at document {index}: expected {expected}, got {actual}")]
    DimensionMismatch {
        index: usize,
        expected: usize,
        actual: usize,
    },

    /// The encoder failed. May be transient.
    #[error("encoding failed: {0}")]
    Encoding(#[from] SemanticError),

    /// The clustering capability is not compiled into this build.
    #[error("clustering unavailable: {0}")]
    ClusteringUnavailable(String),

    /// The clustering routine returned labels that do not fit the request.
    #[error("clustering failed: {0}")]
    Clustering(String),
}

impl PipelineError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        PipelineError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Offending field for validation failures.
    pub fn field(&self) -> Option<&str> {
        match self {
            PipelineError::Validation { field, .. } => Some(field),
            _ => None,
        }
    }
}
