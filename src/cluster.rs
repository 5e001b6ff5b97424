use std::collections::BTreeMap;
use std::sync::Arc;

use semantic::Encoder;
use tracing::debug;

use crate::{BatchRunner, Cluster, ClusterMember, ClusterOutput, PipelineConfig, PipelineError};

/// Partitions vectors into `k` groups.
///
/// Implementations return one label per input vector, each in `0..k`, and
/// must be deterministic for a fixed `seed`.
pub trait Clusterer: Send + Sync {
    fn cluster(&self, vectors: &[Vec<f32>], k: usize, seed: u64) -> Result<Vec<usize>, PipelineError>;
}

/// The clustering routine compiled into this build, if any.
#[cfg(feature = "clustering")]
pub fn default_clusterer(config: &PipelineConfig) -> Option<Arc<dyn Clusterer>> {
    Some(Arc::new(crate::KMeans::from_config(config)))
}

/// The clustering routine compiled into this build, if any.
#[cfg(not(feature = "clustering"))]
pub fn default_clusterer(_config: &PipelineConfig) -> Option<Arc<dyn Clusterer>> {
    None
}

/// Effective cluster count for `n` documents.
///
/// The count is a target: anything above `n` is lowered to `n`. Zero is rejected.
pub fn resolve_cluster_count(
    requested: Option<usize>,
    default: usize,
    n: usize,
) -> Result<usize, PipelineError> {
    match requested {
        Some(0) => Err(PipelineError::validation(
            "num_clusters",
            "must be a positive integer",
        )),
        Some(k) => Ok(k.min(n)),
        None => Ok(default.min(n)),
    }
}

pub struct ClusterGrouper<'a> {
    encoder: &'a dyn Encoder,
    clusterer: Option<&'a dyn Clusterer>,
    seed: u64,
    default_clusters: usize,
    chunk_size: usize,
}

impl<'a> ClusterGrouper<'a> {
    pub fn new(encoder: &'a dyn Encoder, clusterer: Option<&'a dyn Clusterer>) -> Self {
        Self {
            encoder,
            clusterer,
            seed: 42,
            default_clusters: 5,
            chunk_size: 32,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_default_clusters(mut self, k: usize) -> Self {
        self.default_clusters = k;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Encode `documents` and group them into at most `num_clusters` clusters.
    pub fn group(
        &self,
        documents: &[String],
        num_clusters: Option<usize>,
    ) -> Result<ClusterOutput, PipelineError> {
        if documents.is_empty() {
            return Err(PipelineError::validation(
                "documents",
                "must contain at least one document",
            ));
        }
        let k = resolve_cluster_count(num_clusters, self.default_clusters, documents.len())?;
        let clusterer = self.clusterer.ok_or_else(|| {
            PipelineError::ClusteringUnavailable(
                "this build does not include a clustering routine".into(),
            )
        })?;

        let vectors = BatchRunner::new(self.encoder, self.chunk_size)?
            .run(documents, true)?
            .vectors;
        let labels = clusterer.cluster(&vectors, k, self.seed)?;
        let clusters = assemble(documents, &labels, k)?;

        debug!(
            documents = documents.len(),
            k,
            non_empty = clusters.len(),
            "documents clustered"
        );
        Ok(ClusterOutput {
            clusters,
            num_clusters: k,
        })
    }
}

/// Bucket documents by label: ids ascending, members in input order, empty ids omitted.
fn assemble(documents: &[String], labels: &[usize], k: usize) -> Result<Vec<Cluster>, PipelineError> {
    if labels.len() != documents.len() {
        return Err(PipelineError::Clustering(format!(
            "expected {} labels, got {}",
            documents.len(),
            labels.len()
        )));
    }
    let mut buckets: BTreeMap<usize, Vec<ClusterMember>> = BTreeMap::new();
    for (index, (&label, text)) in labels.iter().zip(documents).enumerate() {
        if label >= k {
            return Err(PipelineError::Clustering(format!(
                "label {label} for document {index} is outside 0..{k}"
            )));
        }
        buckets.entry(label).or_default().push(ClusterMember {
            index,
            text: text.clone(),
        });
    }
    Ok(buckets
        .into_iter()
        .map(|(cluster_id, documents)| Cluster {
            cluster_id,
            documents,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use semantic::StubEncoder;

    /// Returns a fixed label sequence.
    struct FixedLabels(Vec<usize>);

    impl Clusterer for FixedLabels {
        fn cluster(&self, _vectors: &[Vec<f32>], _k: usize, _seed: u64) -> Result<Vec<usize>, PipelineError> {
            Ok(self.0.clone())
        }
    }

    fn docs(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("document {i}")).collect()
    }

    #[test]
    fn cluster_count_policy() {
        assert_eq!(resolve_cluster_count(None, 5, 3).unwrap(), 3);
        assert_eq!(resolve_cluster_count(None, 5, 8).unwrap(), 5);
        assert_eq!(resolve_cluster_count(Some(10), 5, 3).unwrap(), 3);
        assert_eq!(resolve_cluster_count(Some(2), 5, 3).unwrap(), 2);
        let err = resolve_cluster_count(Some(0), 5, 3).unwrap_err();
        assert_eq!(err.field(), Some("num_clusters"));
    }

    #[test]
    fn groups_sorted_by_id_members_in_input_order() {
        let encoder = StubEncoder::new("stub", 4).unwrap();
        let labels = FixedLabels(vec![2, 0, 2, 0, 1]);
        let grouper = ClusterGrouper::new(&encoder, Some(&labels));
        let out = grouper.group(&docs(5), Some(3)).unwrap();

        let ids: Vec<usize> = out.clusters.iter().map(|c| c.cluster_id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
        let members: Vec<Vec<usize>> = out
            .clusters
            .iter()
            .map(|c| c.documents.iter().map(|m| m.index).collect())
            .collect();
        assert_eq!(members, vec![vec![1, 3], vec![4], vec![0, 2]]);
        assert_eq!(out.clusters[2].documents[1].text, "document 2");
        assert_eq!(out.num_clusters, 3);
    }

    #[test]
    fn empty_clusters_are_omitted() {
        let encoder = StubEncoder::new("stub", 4).unwrap();
        let labels = FixedLabels(vec![0, 2, 0]);
        let out = ClusterGrouper::new(&encoder, Some(&labels))
            .group(&docs(3), Some(3))
            .unwrap();
        let ids: Vec<usize> = out.clusters.iter().map(|c| c.cluster_id).collect();
        assert_eq!(ids, vec![0, 2]);
    }

    #[test]
    fn out_of_range_label_is_an_error() {
        let encoder = StubEncoder::new("stub", 4).unwrap();
        let labels = FixedLabels(vec![0, 5]);
        let err = ClusterGrouper::new(&encoder, Some(&labels))
            .group(&docs(2), Some(2))
            .unwrap_err();
        assert!(matches!(err, PipelineError::Clustering(_)));
    }

    #[test]
    fn label_count_mismatch_is_an_error() {
        let encoder = StubEncoder::new("stub", 4).unwrap();
        let labels = FixedLabels(vec![0]);
        let err = ClusterGrouper::new(&encoder, Some(&labels))
            .group(&docs(2), Some(2))
            .unwrap_err();
        assert!(matches!(err, PipelineError::Clustering(_)));
    }

    #[test]
    fn missing_clusterer_is_reported() {
        let encoder = StubEncoder::new("stub", 4).unwrap();
        let err = ClusterGrouper::new(&encoder, None)
            .group(&docs(3), None)
            .unwrap_err();
        assert!(matches!(err, PipelineError::ClusteringUnavailable(_)));
    }

    #[test]
    fn empty_documents_rejected() {
        let encoder = StubEncoder::new("stub", 4).unwrap();
        let err = ClusterGrouper::new(&encoder, None).group(&[], None).unwrap_err();
        assert_eq!(err.field(), Some("documents"));
    }
}
