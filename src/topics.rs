use semantic::Encoder;
use tracing::debug;

use crate::rank::{rank, resolve_top_k};
use crate::{BatchRunner, PipelineError, ScoredResult, TopicMatches};

/// Per-topic ranking over one shared document vector set.
///
/// Documents are encoded once; each topic is encoded and ranked on its own,
/// so one topic's results never influence another's.
pub struct TopicFilter<'a> {
    encoder: &'a dyn Encoder,
    threshold: f64,
    default_top_k: usize,
    chunk_size: usize,
}

impl<'a> TopicFilter<'a> {
    pub fn new(encoder: &'a dyn Encoder, threshold: f64) -> Self {
        Self {
            encoder,
            threshold,
            default_top_k: 10,
            chunk_size: 32,
        }
    }

    /// Result cap used when the caller gives none; lowered to the document count.
    pub fn with_default_top_k(mut self, top_k: usize) -> Self {
        self.default_top_k = top_k;
        self
    }

    /// Chunk size for encoding the document set.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Rank `documents` for every topic and keep results scoring above the threshold.
    pub fn filter(
        &self,
        topics: &[String],
        documents: &[String],
        top_k: Option<usize>,
    ) -> Result<Vec<TopicMatches>, PipelineError> {
        if documents.is_empty() {
            return Err(PipelineError::validation(
                "documents",
                "must contain at least one document",
            ));
        }
        let k = match top_k {
            Some(_) => resolve_top_k(top_k, documents.len())?,
            None => self.default_top_k.clamp(1, documents.len()),
        };

        let doc_vectors = BatchRunner::new(self.encoder, self.chunk_size)?
            .run(documents, true)?
            .vectors;

        topics
            .iter()
            .map(|topic| {
                let topic_vector = self
                    .encoder
                    .encode(std::slice::from_ref(topic), true)?
                    .into_iter()
                    .next()
                    .ok_or_else(|| {
                        PipelineError::Encoding(semantic::SemanticError::Inference(
                            "encoder returned no vector for topic".into(),
                        ))
                    })?;
                let ranked = rank(&topic_vector, &doc_vectors, Some(k))?;
                let kept = apply_threshold(ranked, self.threshold)
                    .map(|r| {
                        let text = documents[r.index].clone();
                        r.with_text(text)
                    })
                    .collect::<Vec<_>>();
                debug!(topic = %topic, kept = kept.len(), "topic filtered");
                Ok(TopicMatches {
                    topic: topic.clone(),
                    documents: kept,
                })
            })
            .collect()
    }
}

/// Drop results scoring at or below `threshold`, preserving order.
pub fn apply_threshold(
    ranked: Vec<ScoredResult>,
    threshold: f64,
) -> impl Iterator<Item = ScoredResult> {
    ranked.into_iter().filter(move |r| r.score > threshold)
}
