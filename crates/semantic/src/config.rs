use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Runtime configuration describing which model/tokenizer to load and how.
///
/// Every field has a default so partial configuration files and environment
/// overrides deserialize cleanly.
///
/// # Example
/// ```no_run
/// use semantic::{load_encoder, EncoderConfig};
///
/// # async fn run() -> Result<(), semantic::SemanticError> {
/// let cfg = EncoderConfig {
///     mode: "stub".into(),
///     stub_dimension: 128,
///     ..Default::default()
/// };
/// let encoder = load_encoder(&cfg).await?;
/// assert_eq!(encoder.embedding_dimension(), 128);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EncoderConfig {
    /// Encoder backend: `"onnx"` (local inference) or `"stub"` (deterministic hash vectors).
    pub mode: String,
    /// Model label reported on every response; also selects the asset directory.
    pub model_name: String,
    /// Root holding one `<model_name>/` directory per model.
    pub models_dir: PathBuf,
    /// Overrides `<models_dir>/<model_name>/onnx/model.onnx`.
    pub model_path: Option<PathBuf>,
    /// Fetched into the model path when the file is missing.
    pub model_url: Option<String>,
    /// Overrides `<models_dir>/<model_name>/tokenizer.json`.
    pub tokenizer_path: Option<PathBuf>,
    pub tokenizer_url: Option<String>,
    /// Fetch missing assets of [`KNOWN_MODELS`] entries from `hub_base_url`.
    pub download_known_models: bool,
    pub hub_base_url: String,
    /// Token budget per input; longer inputs are truncated.
    pub max_seq_length: usize,
    /// Output dimension of the stub encoder.
    pub stub_dimension: usize,
    /// Serve stub embeddings when ONNX assets are unavailable instead of failing startup.
    pub fallback_to_stub: bool,
    /// ONNX Runtime intra-op thread count.
    pub intra_threads: usize,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            mode: "onnx".into(),
            model_name: "all-MiniLM-L6-v2".into(),
            models_dir: PathBuf::from("./models"),
            model_path: None,
            model_url: None,
            tokenizer_path: None,
            tokenizer_url: None,
            download_known_models: false,
            hub_base_url: "https://huggingface.co".into(),
            max_seq_length: 256,
            stub_dimension: 384,
            fallback_to_stub: true,
            intra_threads: 4,
        }
    }
}

impl EncoderConfig {
    /// Stub-mode configuration, handy for tests and slim deployments.
    pub fn stub(dimension: usize) -> Self {
        Self {
            mode: "stub".into(),
            model_name: "stub".into(),
            stub_dimension: dimension,
            ..Self::default()
        }
    }

    /// Catalogue entry for [`model_name`](Self::model_name), if listed.
    pub fn known_model(&self) -> Option<&'static KnownModel> {
        KNOWN_MODELS.iter().find(|m| m.name == self.model_name)
    }
}

/// Models known to work with the ONNX backend, surfaced by the model info endpoint.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct KnownModel {
    pub name: &'static str,
    /// Hub repository holding `onnx/model.onnx` and `tokenizer.json`.
    pub repo: &'static str,
    pub dimensions: usize,
    pub description: &'static str,
}

pub const KNOWN_MODELS: &[KnownModel] = &[
    KnownModel {
        name: "all-MiniLM-L6-v2",
        repo: "sentence-transformers/all-MiniLM-L6-v2",
        dimensions: 384,
        description: "Fast and good quality (default)",
    },
    KnownModel {
        name: "all-mpnet-base-v2",
        repo: "sentence-transformers/all-mpnet-base-v2",
        dimensions: 768,
        description: "Better quality, slower",
    },
    KnownModel {
        name: "multi-qa-MiniLM-L6-cos-v1",
        repo: "sentence-transformers/multi-qa-MiniLM-L6-cos-v1",
        dimensions: 384,
        description: "Optimized for Q&A tasks",
    },
    KnownModel {
        name: "paraphrase-multilingual-MiniLM-L12-v2",
        repo: "sentence-transformers/paraphrase-multilingual-MiniLM-L12-v2",
        dimensions: 384,
        description: "Multilingual support",
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_default_values() {
        let cfg = EncoderConfig::default();
        assert_eq!(cfg.mode, "onnx");
        assert_eq!(cfg.model_name, "all-MiniLM-L6-v2");
        assert_eq!(cfg.models_dir, PathBuf::from("./models"));
        assert!(cfg.model_path.is_none());
        assert!(!cfg.download_known_models);
        assert!(cfg.model_url.is_none());
        assert!(cfg.tokenizer_url.is_none());
        assert_eq!(cfg.max_seq_length, 256);
        assert_eq!(cfg.stub_dimension, 384);
        assert!(cfg.fallback_to_stub);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let cfg: EncoderConfig =
            serde_json::from_str(r#"{"mode": "stub", "stub_dimension": 64}"#).unwrap();
        assert_eq!(cfg.mode, "stub");
        assert_eq!(cfg.stub_dimension, 64);
        assert_eq!(cfg.model_name, "all-MiniLM-L6-v2");
        assert_eq!(cfg.max_seq_length, 256);
    }

    #[test]
    fn known_models_include_default() {
        let default = EncoderConfig::default();
        let entry = default.known_model().expect("default model listed");
        assert_eq!(entry.dimensions, 384);
        assert_eq!(entry.repo, "sentence-transformers/all-MiniLM-L6-v2");
        assert_eq!(KNOWN_MODELS.len(), 4);
    }

    #[test]
    fn unlisted_model_is_not_known() {
        let cfg = EncoderConfig {
            model_name: "in-house-encoder".into(),
            ..EncoderConfig::default()
        };
        assert!(cfg.known_model().is_none());
    }
}
