use serde::{Deserialize, Serialize};

/// One ranked document. References its source text by position, never by embedding copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredResult {
    /// Position of the document in the request.
    pub index: usize,
    /// Cosine similarity in `[-1, 1]`.
    pub score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl ScoredResult {
    pub fn new(index: usize, score: f64) -> Self {
        Self {
            index,
            score,
            text: None,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }
}

/// Encoded vectors plus the number of encoder calls it took.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutput {
    pub vectors: Vec<Vec<f32>>,
    pub chunks_processed: usize,
}

impl BatchOutput {
    /// Length of the first vector, or 0 for an empty output.
    pub fn embedding_dimension(&self) -> usize {
        self.vectors.first().map(Vec::len).unwrap_or(0)
    }
}

/// Surviving documents for one topic, best match first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicMatches {
    pub topic: String,
    pub documents: Vec<ScoredResult>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusterMember {
    pub index: usize,
    pub text: String,
}

/// One group produced by the cluster grouper. Members keep input order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cluster {
    pub cluster_id: usize,
    pub documents: Vec<ClusterMember>,
}

/// Grouper output: clusters ascending by id, plus the effective cluster count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterOutput {
    pub clusters: Vec<Cluster>,
    pub num_clusters: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scored_result_omits_missing_text() {
        let json = serde_json::to_string(&ScoredResult::new(2, 0.5)).unwrap();
        assert_eq!(json, r#"{"index":2,"score":0.5}"#);

        let json = serde_json::to_string(&ScoredResult::new(0, 1.0).with_text("doc")).unwrap();
        assert!(json.contains(r#""text":"doc""#));
    }

    #[test]
    fn batch_output_dimension() {
        let empty = BatchOutput {
            vectors: vec![],
            chunks_processed: 0,
        };
        assert_eq!(empty.embedding_dimension(), 0);

        let out = BatchOutput {
            vectors: vec![vec![0.0; 3], vec![1.0; 3]],
            chunks_processed: 1,
        };
        assert_eq!(out.embedding_dimension(), 3);
    }
}
