use std::sync::Arc;

use semantic::Encoder;

use crate::cluster::default_clusterer;
use crate::rank::{rank, resolve_top_k};
use crate::{
    BatchOutput, BatchRunner, ClusterGrouper, ClusterOutput, Clusterer, MetricsSpan,
    PipelineConfig, PipelineError, ScoredResult, TopicFilter, TopicMatches,
};

/// One encoder, one configuration, and every request-level operation built on them.
///
/// The encoder is constructed once by the caller and shared read-only;
/// `Pipeline` itself keeps no per-request state and is `Send + Sync`.
pub struct Pipeline {
    encoder: Arc<dyn Encoder>,
    config: PipelineConfig,
    clusterer: Option<Arc<dyn Clusterer>>,
}

impl Pipeline {
    /// Validate `config` and attach the build's default clustering routine.
    pub fn new(encoder: Arc<dyn Encoder>, config: PipelineConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        let clusterer = default_clusterer(&config);
        Ok(Self {
            encoder,
            config,
            clusterer,
        })
    }

    /// Replace the clustering routine; `None` makes clustering report unavailable.
    pub fn with_clusterer(mut self, clusterer: Option<Arc<dyn Clusterer>>) -> Self {
        self.clusterer = clusterer;
        self
    }

    pub fn encoder(&self) -> &dyn Encoder {
        self.encoder.as_ref()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn clustering_available(&self) -> bool {
        self.clusterer.is_some()
    }

    /// Encode `texts` with the configured chunk size.
    pub fn embed(&self, texts: &[String], normalize: bool) -> Result<BatchOutput, PipelineError> {
        self.embed_batch(texts, None, normalize)
    }

    pub fn embed_single(&self, text: &str, normalize: bool) -> Result<Vec<f32>, PipelineError> {
        let out = self.embed(&[text.to_owned()], normalize)?;
        out.vectors.into_iter().next().ok_or_else(|| {
            PipelineError::Encoding(semantic::SemanticError::Inference(
                "encoder returned no vector".into(),
            ))
        })
    }

    /// Encode `texts` in chunks of `batch_size` (configured default when `None`).
    pub fn embed_batch(
        &self,
        texts: &[String],
        batch_size: Option<usize>,
        normalize: bool,
    ) -> Result<BatchOutput, PipelineError> {
        let span = MetricsSpan::start();
        let result = BatchRunner::new(
            self.encoder.as_ref(),
            batch_size.unwrap_or(self.config.batch_size),
        )
        .and_then(|runner| runner.run(texts, normalize));
        if let Some(span) = span {
            span.record_encode(texts.len(), &result);
        }
        result
    }

    /// Encode `query` and `documents`, then rank. Results carry document text.
    pub fn similarity(
        &self,
        query: &str,
        documents: &[String],
        top_k: Option<usize>,
    ) -> Result<Vec<ScoredResult>, PipelineError> {
        require_documents(documents)?;
        resolve_top_k(top_k, documents.len())?;

        let query_vector = self.embed_single(query, true)?;
        let doc_vectors = self.embed(documents, true)?.vectors;
        let ranked = self.similarity_from_embeddings(&query_vector, &doc_vectors, top_k)?;
        Ok(ranked
            .into_iter()
            .map(|r| {
                let text = documents[r.index].clone();
                r.with_text(text)
            })
            .collect())
    }

    /// Rank caller-supplied vectors. No encoding happens.
    pub fn similarity_from_embeddings(
        &self,
        query: &[f32],
        documents: &[Vec<f32>],
        top_k: Option<usize>,
    ) -> Result<Vec<ScoredResult>, PipelineError> {
        let span = MetricsSpan::start();
        let ranked = rank(query, documents, top_k)?;
        if let Some(span) = span {
            span.record_rank(documents.len());
        }
        Ok(ranked)
    }

    /// Per-topic relevant documents above the configured threshold.
    pub fn find_relevant(
        &self,
        topics: &[String],
        documents: &[String],
        top_k: Option<usize>,
    ) -> Result<Vec<TopicMatches>, PipelineError> {
        let span = MetricsSpan::start();
        let result = TopicFilter::new(self.encoder.as_ref(), self.config.relevance_threshold)
            .with_default_top_k(self.config.relevance_top_k)
            .with_chunk_size(self.config.batch_size)
            .filter(topics, documents, top_k);
        if let Some(span) = span {
            span.record_encode(topics.len() + documents.len(), &result);
        }
        result
    }

    pub fn cluster(
        &self,
        documents: &[String],
        num_clusters: Option<usize>,
    ) -> Result<ClusterOutput, PipelineError> {
        let span = MetricsSpan::start();
        let result = ClusterGrouper::new(self.encoder.as_ref(), self.clusterer.as_deref())
            .with_seed(self.config.cluster_seed)
            .with_default_clusters(self.config.default_clusters)
            .with_chunk_size(self.config.batch_size)
            .group(documents, num_clusters);
        if let Some(span) = span {
            span.record_cluster(&result);
        }
        result
    }
}

fn require_documents(documents: &[String]) -> Result<(), PipelineError> {
    if documents.is_empty() {
        return Err(PipelineError::validation(
            "documents",
            "must contain at least one document",
        ));
    }
    Ok(())
}
