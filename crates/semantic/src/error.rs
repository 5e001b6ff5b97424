use std::io;
use thiserror::Error;

/// Errors surfaced while loading an encoder or running it.
#[derive(Debug, Error)]
pub enum SemanticError {
    /// The ONNX model could not be located locally and no download URL was provided.
    #[error("model file not found: {0}")]
    ModelNotFound(String),
    /// The tokenizer JSON is missing and there was no remote URL to fetch it from.
    #[error("tokenizer missing: {0}")]
    TokenizerMissing(String),
    /// Configuration is inconsistent (unknown mode, zero dimension, missing feature).
    #[error("invalid encoder config: {0}")]
    InvalidConfig(String),
    /// Unable to download remote assets.
    #[error("download failed: {0}")]
    Download(String),
    /// Low-level IO failures while touching the filesystem.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    /// ONNX Runtime or tokenizer failures, or malformed encoder input.
    #[error("inference failure: {0}")]
    Inference(String),
}

impl SemanticError {
    /// Missing local assets are recoverable by serving the stub encoder.
    pub fn is_missing_asset(&self) -> bool {
        matches!(
            self,
            SemanticError::ModelNotFound(_)
                | SemanticError::TokenizerMissing(_)
                | SemanticError::Download(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_model_not_found() {
        let err = SemanticError::ModelNotFound("/path/to/model.onnx".into());
        assert!(err.to_string().contains("model file not found"));
        assert!(err.to_string().contains("/path/to/model.onnx"));
    }

    #[test]
    fn error_invalid_config() {
        let err = SemanticError::InvalidConfig("unknown encoder mode 'gpu'".into());
        assert!(err.to_string().contains("invalid encoder config"));
        assert!(err.to_string().contains("gpu"));
    }

    #[test]
    fn error_from_io() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: SemanticError = io_err.into();
        assert!(err.to_string().contains("io error"));
    }

    #[test]
    fn missing_assets_are_recoverable() {
        assert!(SemanticError::ModelNotFound("m".into()).is_missing_asset());
        assert!(SemanticError::TokenizerMissing("t".into()).is_missing_asset());
        assert!(SemanticError::Download("timeout".into()).is_missing_asset());
        assert!(!SemanticError::Inference("boom".into()).is_missing_asset());
        assert!(!SemanticError::InvalidConfig("bad".into()).is_missing_asset());
    }
}
