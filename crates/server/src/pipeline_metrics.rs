//! Pipeline metrics exported through the `metrics` facade.

use embedding_api::{PipelineError, PipelineMetrics};
use metrics::{counter, histogram};
use std::time::Duration;

/// Forwards pipeline stage timings to whatever recorder is installed.
#[derive(Debug, Default, Clone, Copy)]
pub struct PrometheusPipelineMetrics;

fn outcome(result: Result<(), &PipelineError>) -> &'static str {
    match result {
        Ok(()) => "ok",
        Err(PipelineError::Validation { .. }) => "invalid",
        Err(PipelineError::DimensionMismatch { .. }) => "dimension_mismatch",
        Err(PipelineError::Encoding(_)) => "encoding_error",
        Err(PipelineError::ClusteringUnavailable(_)) => "unavailable",
        Err(PipelineError::Clustering(_)) => "clustering_error",
    }
}

impl PipelineMetrics for PrometheusPipelineMetrics {
    fn record_encode(&self, latency: Duration, texts: usize, result: Result<(), &PipelineError>) {
        let status = outcome(result);
        counter!("embedding_api_encode_requests_total", "status" => status).increment(1);
        counter!("embedding_api_encoded_texts_total").increment(texts as u64);
        histogram!("embedding_api_encode_duration_seconds", "status" => status)
            .record(latency.as_secs_f64());
    }

    fn record_rank(&self, latency: Duration, documents: usize) {
        histogram!("embedding_api_rank_duration_seconds").record(latency.as_secs_f64());
        histogram!("embedding_api_rank_documents").record(documents as f64);
    }

    fn record_cluster(&self, latency: Duration, result: Result<(), &PipelineError>) {
        let status = outcome(result);
        counter!("embedding_api_cluster_requests_total", "status" => status).increment(1);
        histogram!("embedding_api_cluster_duration_seconds", "status" => status)
            .record(latency.as_secs_f64());
    }
}
