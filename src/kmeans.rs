//! Seeded k-means backed by `linfa-clustering`.
//!
//! Every fit draws from a Xoshiro RNG seeded with the request seed, so a
//! given seed, input, and `k` always yield the same labels. Labels are
//! renumbered by first appearance in the input.

use std::collections::HashSet;

use linfa::traits::{Fit, Predict};
use linfa::DatasetBase;
use linfa_clustering::{KMeans as LinfaKMeans, KMeansInit};
use ndarray::Array2;
use rand_xoshiro::rand_core::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;

use crate::{Clusterer, PipelineConfig, PipelineError};

#[derive(Debug, Clone, PartialEq)]
pub struct KMeans {
    /// Independent runs; the one with the lowest inertia wins.
    pub restarts: usize,
    pub max_iterations: u64,
    /// Convergence threshold on centroid movement.
    pub tolerance: f64,
}

impl Default for KMeans {
    fn default() -> Self {
        Self {
            restarts: 10,
            max_iterations: 300,
            tolerance: 1e-4,
        }
    }
}

impl KMeans {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            restarts: config.kmeans_restarts.max(1),
            max_iterations: config.kmeans_max_iterations.max(1) as u64,
            tolerance: config.kmeans_tolerance,
        }
    }
}

impl Clusterer for KMeans {
    fn cluster(&self, vectors: &[Vec<f32>], k: usize, seed: u64) -> Result<Vec<usize>, PipelineError> {
        let n = vectors.len();
        if n == 0 {
            return Ok(Vec::new());
        }
        if k == 0 || k > n {
            return Err(PipelineError::Clustering(format!(
                "cannot form {k} clusters from {n} vectors"
            )));
        }
        let records = to_records(vectors)?;
        // k-means++ cannot place more centroids than there are distinct points.
        let k = k.min(distinct_points(vectors));
        let dataset = DatasetBase::from(records.clone());

        let model = LinfaKMeans::params_with_rng(k, Xoshiro256Plus::seed_from_u64(seed))
            .init_method(KMeansInit::KMeansPlusPlus)
            .n_runs(self.restarts.max(1))
            .max_n_iterations(self.max_iterations)
            .tolerance(self.tolerance)
            .fit(&dataset)
            .map_err(|e| PipelineError::Clustering(format!("k-means fit failed: {e}")))?;

        let labels = model.predict(&records);
        Ok(relabel_by_first_appearance(&labels.to_vec()))
    }
}

/// Stack vectors into an `n x dim` matrix, rejecting ragged input.
fn to_records(vectors: &[Vec<f32>]) -> Result<Array2<f64>, PipelineError> {
    let dim = vectors.first().map(Vec::len).unwrap_or(0);
    if let Some(index) = vectors.iter().position(|v| v.len() != dim) {
        return Err(PipelineError::Clustering(format!(
            "vector {index} has length {}, expected {dim}",
            vectors[index].len()
        )));
    }
    let flat: Vec<f64> = vectors
        .iter()
        .flat_map(|v| v.iter().map(|&x| f64::from(x)))
        .collect();
    Array2::from_shape_vec((vectors.len(), dim), flat)
        .map_err(|e| PipelineError::Clustering(e.to_string()))
}

fn distinct_points(vectors: &[Vec<f32>]) -> usize {
    vectors
        .iter()
        .map(|v| v.iter().map(|x| x.to_bits()).collect::<Vec<u32>>())
        .collect::<HashSet<_>>()
        .len()
}

fn relabel_by_first_appearance(labels: &[usize]) -> Vec<usize> {
    let mut mapping: Vec<Option<usize>> = Vec::new();
    let mut next = 0;
    labels
        .iter()
        .map(|&label| {
            if label >= mapping.len() {
                mapping.resize(label + 1, None);
            }
            *mapping[label].get_or_insert_with(|| {
                next += 1;
                next - 1
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blobs() -> Vec<Vec<f32>> {
        vec![
            vec![0.0, 0.0],
            vec![10.0, 10.0],
            vec![0.1, 0.2],
            vec![10.2, 9.9],
            vec![-0.1, 0.1],
            vec![9.8, 10.1],
        ]
    }

    #[test]
    fn separates_obvious_groups() {
        let labels = KMeans::default().cluster(&blobs(), 2, 42).unwrap();
        assert_eq!(labels, vec![0, 1, 0, 1, 0, 1]);
    }

    #[test]
    fn same_seed_same_labels() {
        let points: Vec<Vec<f32>> = (0..40)
            .map(|i| {
                let t = i as f32 * 0.37;
                vec![t.sin(), t.cos(), (t * 0.5).sin()]
            })
            .collect();
        let km = KMeans::default();
        let first = km.cluster(&points, 4, 42).unwrap();
        let second = km.cluster(&points, 4, 42).unwrap();
        assert_eq!(first, second);
        assert!(first.iter().all(|&l| l < 4));
    }

    #[test]
    fn k_equal_n_gives_singletons() {
        let points = vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![-1.0, 0.0]];
        let labels = KMeans::default().cluster(&points, 3, 42).unwrap();
        assert_eq!(labels, vec![0, 1, 2]);
    }

    #[test]
    fn duplicate_points_collapse_into_fewer_clusters() {
        let points = vec![vec![1.0, 1.0], vec![1.0, 1.0], vec![1.0, 1.0], vec![0.0, 2.0]];
        let labels = KMeans::default().cluster(&points, 3, 7).unwrap();
        assert_eq!(labels, vec![0, 0, 0, 1]);
    }

    #[test]
    fn single_cluster_labels_everything_zero() {
        let labels = KMeans::default().cluster(&blobs(), 1, 42).unwrap();
        assert_eq!(labels, vec![0; 6]);
    }

    #[test]
    fn rejects_k_above_n() {
        let err = KMeans::default().cluster(&blobs(), 7, 42).unwrap_err();
        assert!(matches!(err, PipelineError::Clustering(_)));
    }

    #[test]
    fn rejects_ragged_vectors() {
        let points = vec![vec![1.0, 0.0], vec![1.0]];
        assert!(KMeans::default().cluster(&points, 1, 42).is_err());
    }

    #[test]
    fn relabels_by_first_appearance() {
        assert_eq!(relabel_by_first_appearance(&[2, 2, 0, 1, 0]), vec![0, 0, 1, 2, 1]);
    }

    #[test]
    fn config_carries_into_params() {
        let config = PipelineConfig {
            kmeans_restarts: 0,
            kmeans_max_iterations: 50,
            ..PipelineConfig::default()
        };
        let km = KMeans::from_config(&config);
        assert_eq!(km.restarts, 1);
        assert_eq!(km.max_iterations, 50);
    }
}
