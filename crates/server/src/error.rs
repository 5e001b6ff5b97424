use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use embedding_api::PipelineError;
use serde::{Deserialize, Serialize};
use serde_json::json;

pub type ServerResult<T> = Result<T, ServerError>;

/// Server error types
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Request timeout")]
    Timeout,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found")]
    NotFound,
}

/// API error response structure
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ServerError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::Timeout => StatusCode::REQUEST_TIMEOUT,
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::NotFound => StatusCode::NOT_FOUND,
            ServerError::Pipeline(err) => match err {
                PipelineError::Validation { .. } => StatusCode::BAD_REQUEST,
                PipelineError::DimensionMismatch { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                PipelineError::Encoding(_) => StatusCode::SERVICE_UNAVAILABLE,
                PipelineError::ClusteringUnavailable(_) => StatusCode::NOT_IMPLEMENTED,
                PipelineError::Clustering(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ServerError::Internal(_) | ServerError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get error code string
    pub fn error_code(&self) -> &'static str {
        match self {
            ServerError::Timeout => "REQUEST_TIMEOUT",
            ServerError::BadRequest(_) => "BAD_REQUEST",
            ServerError::Pipeline(err) => match err {
                PipelineError::Validation { .. } => "VALIDATION_ERROR",
                PipelineError::DimensionMismatch { .. } => "DIMENSION_MISMATCH",
                PipelineError::Encoding(_) => "ENCODING_ERROR",
                PipelineError::ClusteringUnavailable(_) => "CLUSTERING_UNAVAILABLE",
                PipelineError::Clustering(_) => "CLUSTERING_ERROR",
            },
            ServerError::Internal(_) => "INTERNAL_ERROR",
            ServerError::Config(_) => "CONFIG_ERROR",
            ServerError::NotFound => "NOT_FOUND",
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            ServerError::Pipeline(PipelineError::Validation { field, .. }) => {
                Some(json!({ "field": field }))
            }
            ServerError::Pipeline(PipelineError::DimensionMismatch {
                index,
                expected,
                actual,
            }) => Some(json!({ "index": index, "expected": expected, "actual": actual })),
            _ => None,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, status = %status, "request failed");
        } else {
            tracing::debug!(error = %self, status = %status, "request rejected");
        }

        let body = ErrorResponse {
            error: ErrorDetail {
                code: self.error_code().to_string(),
                message: self.to_string(),
                details: self.details(),
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ServerError {
    fn from(rejection: JsonRejection) -> Self {
        ServerError::BadRequest(rejection.body_text())
    }
}

impl From<axum::BoxError> for ServerError {
    /// Errors surfaced by the tower middleware stack.
    fn from(err: axum::BoxError) -> Self {
        if err.is::<tower::timeout::error::Elapsed>() {
            ServerError::Timeout
        } else {
            ServerError::Internal(format!("middleware failed: {err}"))
        }
    }
}

impl From<tokio::task::JoinError> for ServerError {
    fn from(err: tokio::task::JoinError) -> Self {
        ServerError::Internal(format!("worker task failed: {err}"))
    }
}
