//! Pipeline tuning knobs.
//!
//! Every field has a default, so the struct can be embedded in a larger
//! configuration file and only the overridden keys need to be present.
//!
//! ```yaml
//! pipeline:
//!   batch_size: 32
//!   relevance_threshold: 0.3
//!   relevance_top_k: 10
//!   default_clusters: 5
//!   cluster_seed: 42
//!   kmeans_restarts: 10
//!   kmeans_max_iterations: 300
//!   kmeans_tolerance: 0.0001
//! ```

use serde::{Deserialize, Serialize};

use crate::PipelineError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Default chunk size for the batch runner.
    pub batch_size: usize,
    /// Topic filter keeps results scoring strictly above this.
    pub relevance_threshold: f64,
    /// Default per-topic result cap (lowered to the document count when smaller).
    pub relevance_top_k: usize,
    /// Default cluster count (lowered to the document count when smaller).
    pub default_clusters: usize,
    /// Seed for k-means initialization.
    pub cluster_seed: u64,
    /// Independent k-means runs; the lowest-inertia run wins.
    pub kmeans_restarts: usize,
    pub kmeans_max_iterations: usize,
    /// Convergence bound on the summed squared centroid shift.
    pub kmeans_tolerance: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: 32,
            relevance_threshold: 0.3,
            relevance_top_k: 10,
            default_clusters: 5,
            cluster_seed: 42,
            kmeans_restarts: 10,
            kmeans_max_iterations: 300,
            kmeans_tolerance: 1e-4,
        }
    }
}

impl PipelineConfig {
    /// Rejects values that would make a component meaningless.
    pub fn validate(&self) -> Result<(), PipelineError> {
        let positive = [
            ("pipeline.batch_size", self.batch_size),
            ("pipeline.relevance_top_k", self.relevance_top_k),
            ("pipeline.default_clusters", self.default_clusters),
            ("pipeline.kmeans_restarts", self.kmeans_restarts),
            ("pipeline.kmeans_max_iterations", self.kmeans_max_iterations),
        ];
        for (field, value) in positive {
            if value == 0 {
                return Err(PipelineError::validation(field, "must be greater than 0"));
            }
        }
        if !(-1.0..=1.0).contains(&self.relevance_threshold) {
            return Err(PipelineError::validation(
                "pipeline.relevance_threshold",
                format!(
                    "must lie in [-1, 1], got {}",
                    self.relevance_threshold
                ),
            ));
        }
        if !self.kmeans_tolerance.is_finite() || self.kmeans_tolerance < 0.0 {
            return Err(PipelineError::validation(
                "pipeline.kmeans_tolerance",
                "must be a finite, non-negative number",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_service_contract() {
        let cfg = PipelineConfig::default();
        assert_eq!(cfg.batch_size, 32);
        assert_eq!(cfg.relevance_threshold, 0.3);
        assert_eq!(cfg.relevance_top_k, 10);
        assert_eq!(cfg.default_clusters, 5);
        assert_eq!(cfg.cluster_seed, 42);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn zero_batch_size_rejected() {
        let cfg = PipelineConfig {
            batch_size: 0,
            ..PipelineConfig::default()
        };
        let err = cfg.validate().unwrap_err();
        assert_eq!(err.field(), Some("pipeline.batch_size"));
    }

    #[test]
    fn threshold_out_of_range_rejected() {
        let cfg = PipelineConfig {
            relevance_threshold: 1.5,
            ..PipelineConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let cfg: PipelineConfig = serde_json::from_str(r#"{"batch_size": 8}"#).unwrap();
        assert_eq!(cfg.batch_size, 8);
        assert_eq!(cfg.default_clusters, 5);
    }
}
