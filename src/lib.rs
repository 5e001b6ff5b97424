//! Embedding request pipeline.
//!
//! Validated text batches go through an [`Encoder`] in bounded chunks, get
//! ranked against a query by cosine similarity, filtered per topic with a
//! relevance threshold, or grouped with seeded k-means. The [`Pipeline`] type
//! wires the components to one encoder and one [`PipelineConfig`]; the HTTP
//! layer lives in the `embedding-server` crate.
//!
//! ```no_run
//! use std::sync::Arc;
//! use embedding_api::{Pipeline, PipelineConfig, StubEncoder};
//!
//! let encoder = Arc::new(StubEncoder::new("stub", 8).unwrap());
//! let pipeline = Pipeline::new(encoder, PipelineConfig::default()).unwrap();
//! let ranked = pipeline
//!     .similarity("rust", &["crab".into(), "snake".into()], Some(1))
//!     .unwrap();
//! assert_eq!(ranked.len(), 1);
//! ```

pub mod batch;
pub mod cluster;
pub mod config;
pub mod error;
#[cfg(feature = "clustering")]
pub mod kmeans;
pub mod pipeline;
pub mod rank;
pub mod topics;
pub mod types;
pub mod validate;

pub use batch::BatchRunner;
pub use cluster::{ClusterGrouper, Clusterer, default_clusterer, resolve_cluster_count};
pub use config::PipelineConfig;
pub use error::PipelineError;
#[cfg(feature = "clustering")]
pub use kmeans::KMeans;
pub use pipeline::Pipeline;
pub use rank::{cosine_similarity, rank, resolve_top_k};
pub use topics::TopicFilter;
pub use types::{BatchOutput, Cluster, ClusterMember, ClusterOutput, ScoredResult, TopicMatches};

pub use semantic::{Encoder, EncoderConfig, SemanticError, StubEncoder, load_encoder};

use std::sync::{Arc, OnceLock, RwLock};
use std::time::{Duration, Instant};

/// Metrics observer for pipeline stages.
pub trait PipelineMetrics: Send + Sync {
    /// One batch-runner invocation over `texts` inputs.
    fn record_encode(&self, latency: Duration, texts: usize, result: Result<(), &PipelineError>);
    /// One ranking pass over `documents` candidates.
    fn record_rank(&self, latency: Duration, documents: usize);
    fn record_cluster(&self, latency: Duration, result: Result<(), &PipelineError>);
}

/// Install or clear the global metrics recorder.
pub fn set_pipeline_metrics(recorder: Option<Arc<dyn PipelineMetrics>>) {
    let mut guard = metrics_lock()
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    *guard = recorder;
}

fn metrics_lock() -> &'static RwLock<Option<Arc<dyn PipelineMetrics>>> {
    static METRICS: OnceLock<RwLock<Option<Arc<dyn PipelineMetrics>>>> = OnceLock::new();
    METRICS.get_or_init(|| RwLock::new(None))
}

fn metrics_recorder() -> Option<Arc<dyn PipelineMetrics>> {
    metrics_lock()
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clone()
}

pub(crate) struct MetricsSpan {
    recorder: Arc<dyn PipelineMetrics>,
    start: Instant,
}

impl MetricsSpan {
    pub(crate) fn start() -> Option<Self> {
        metrics_recorder().map(|recorder| Self {
            recorder,
            start: Instant::now(),
        })
    }

    pub(crate) fn record_encode<T>(self, texts: usize, result: &Result<T, PipelineError>) {
        self.recorder
            .record_encode(self.start.elapsed(), texts, result.as_ref().map(|_| ()));
    }

    pub(crate) fn record_rank(self, documents: usize) {
        self.recorder.record_rank(self.start.elapsed(), documents);
    }

    pub(crate) fn record_cluster<T>(self, result: &Result<T, PipelineError>) {
        self.recorder
            .record_cluster(self.start.elapsed(), result.as_ref().map(|_| ()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct CountingMetrics {
        events: RwLock<Vec<&'static str>>,
    }

    impl CountingMetrics {
        fn snapshot(&self) -> Vec<&'static str> {
            self.events.read().unwrap().clone()
        }
    }

    impl PipelineMetrics for CountingMetrics {
        fn record_encode(&self, _latency: Duration, _texts: usize, result: Result<(), &PipelineError>) {
            let label = if result.is_ok() { "encode_ok" } else { "encode_err" };
            self.events.write().unwrap().push(label);
        }

        fn record_rank(&self, _latency: Duration, _documents: usize) {
            self.events.write().unwrap().push("rank");
        }

        fn record_cluster(&self, _latency: Duration, result: Result<(), &PipelineError>) {
            let label = if result.is_ok() { "cluster_ok" } else { "cluster_err" };
            self.events.write().unwrap().push(label);
        }
    }

    #[test]
    fn metrics_recorder_tracks_pipeline_outcome() {
        let metrics = Arc::new(CountingMetrics::default());
        set_pipeline_metrics(Some(metrics.clone()));

        let encoder = Arc::new(StubEncoder::new("stub", 16).unwrap());
        let pipeline = Pipeline::new(encoder, PipelineConfig::default()).unwrap();
        let docs: Vec<String> = vec!["alpha".into(), "beta".into()];
        let ranked = pipeline.similarity("alpha", &docs, None);
        assert!(ranked.is_ok());

        let events = metrics.snapshot();
        assert!(events.contains(&"encode_ok"));
        assert!(events.contains(&"rank"));

        set_pipeline_metrics(None);
    }
}
