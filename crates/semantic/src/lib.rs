//! Sentence-embedding encoder adapter
//!
//! This crate turns text into dense vectors. It hides the model behind the
//! [`Encoder`] trait so the ranking and clustering pipeline never touches ONNX
//! Runtime directly.
//!
//! Two backends:
//!
//! - **ONNX mode** (`onnx` feature) - run a sentence-transformer locally.
//!   Requires `<models_dir>/<model_name>/onnx/model.onnx` and `tokenizer.json`,
//!   downloaded on first start from configured URLs or, for catalogue models,
//!   from the hub when `download_known_models` is on.
//! - **Stub mode** - deterministic hash-derived vectors. Handy for tests and for
//!   running the service without model files.
//!
//! If the model files are missing and `fallback_to_stub` is on, loading falls
//! back to the stub instead of failing startup. The stand-in reports itself as
//! `stub(<model>)` and [`Encoder::is_fallback`] returns true, so nobody
//! mistakes stub vectors for real ones.
//!
//! ## Loading once
//!
//! Call [`load_encoder`] once at process start and share the returned
//! `Arc<dyn Encoder>`. Encoders are immutable after load; the ONNX session is
//! serialized internally.
//!
//! ```no_run
//! use semantic::{load_encoder, EncoderConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), semantic::SemanticError> {
//!     let encoder = load_encoder(&EncoderConfig::default()).await?;
//!     let vectors = encoder.encode(&["This is a test.".to_string()], true)?;
//!     assert_eq!(vectors[0].len(), encoder.embedding_dimension());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod encoder;
pub mod error;
pub mod normalize;
pub mod stub;

#[cfg(feature = "onnx")]
mod assets;
#[cfg(feature = "onnx")]
mod onnx;

use std::sync::Arc;

use tracing::{info, warn};

pub use crate::config::{EncoderConfig, KnownModel, KNOWN_MODELS};
pub use crate::encoder::Encoder;
pub use crate::error::SemanticError;
pub use crate::normalize::{l2_norm, l2_normalize_in_place};
pub use crate::stub::StubEncoder;

#[cfg(feature = "onnx")]
pub use crate::onnx::OnnxEncoder;

/// Builds the encoder described by `cfg`.
///
/// `"stub"` always succeeds for a non-zero dimension. `"onnx"` resolves model
/// assets (downloading them if URLs are set) and probes the output dimension;
/// missing assets degrade to the stub when `cfg.fallback_to_stub` is true.
pub async fn load_encoder(cfg: &EncoderConfig) -> Result<Arc<dyn Encoder>, SemanticError> {
    match cfg.mode.as_str() {
        "stub" => {
            let encoder = StubEncoder::from_config(cfg)?;
            info!(
                model = %encoder.model_name(),
                dimension = encoder.embedding_dimension(),
                "stub encoder ready"
            );
            Ok(Arc::new(encoder))
        }
        "onnx" => load_onnx_encoder(cfg).await,
        other => Err(SemanticError::InvalidConfig(format!(
            "unknown encoder mode '{other}', expected 'onnx' or 'stub'"
        ))),
    }
}

#[cfg(feature = "onnx")]
async fn load_onnx_encoder(cfg: &EncoderConfig) -> Result<Arc<dyn Encoder>, SemanticError> {
    let assets = match assets::resolve_model_assets(cfg).await {
        Ok(assets) => assets,
        Err(err) if cfg.fallback_to_stub && err.is_missing_asset() => {
            let encoder = StubEncoder::fallback_for(cfg)?;
            warn!(
                error = %err,
                model = %encoder.model_name(),
                "model assets unavailable, serving stub embeddings"
            );
            return Ok(Arc::new(encoder));
        }
        Err(err) => return Err(err),
    };
    let encoder = OnnxEncoder::load(cfg, &assets)?;
    Ok(Arc::new(encoder))
}

#[cfg(not(feature = "onnx"))]
async fn load_onnx_encoder(cfg: &EncoderConfig) -> Result<Arc<dyn Encoder>, SemanticError> {
    if cfg.fallback_to_stub {
        let encoder = StubEncoder::fallback_for(cfg)?;
        warn!(
            model = %encoder.model_name(),
            "built without the `onnx` feature, serving stub embeddings"
        );
        return Ok(Arc::new(encoder));
    }
    Err(SemanticError::InvalidConfig(
        "encoder mode 'onnx' requires the `onnx` feature".into(),
    ))
}
