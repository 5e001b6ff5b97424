use fxhash::hash64;

use crate::normalize::l2_normalize_in_place;
use crate::{Encoder, EncoderConfig, SemanticError};

/// Deterministic encoder used in stub mode or when the model assets are unavailable.
///
/// Each component is derived from a hash of the input text mixed with the
/// component index, giving reproducible, roughly uncorrelated vectors at minimal
/// CPU cost. Identical texts always map to identical vectors.
#[derive(Debug, Clone)]
pub struct StubEncoder {
    model_name: String,
    dimension: usize,
    max_seq_length: usize,
    fallback: bool,
}

impl StubEncoder {
    pub fn new(model_name: impl Into<String>, dimension: usize) -> Result<Self, SemanticError> {
        if dimension == 0 {
            return Err(SemanticError::InvalidConfig(
                "stub dimension must be greater than 0".into(),
            ));
        }
        Ok(Self {
            model_name: model_name.into(),
            dimension,
            max_seq_length: 256,
            fallback: false,
        })
    }

    pub fn from_config(cfg: &EncoderConfig) -> Result<Self, SemanticError> {
        let mut encoder = Self::new(cfg.model_name.clone(), cfg.stub_dimension)?;
        encoder.max_seq_length = cfg.max_seq_length;
        Ok(encoder)
    }

    /// Stand-in for `cfg.model_name` when its assets cannot be loaded.
    ///
    /// Reports itself as `stub(<model>)` so responses never pass hash vectors
    /// off as the configured model.
    pub fn fallback_for(cfg: &EncoderConfig) -> Result<Self, SemanticError> {
        let mut encoder = Self::from_config(cfg)?;
        encoder.model_name = format!("stub({})", cfg.model_name);
        encoder.fallback = true;
        Ok(encoder)
    }

    fn embed_one(&self, text: &str, normalize: bool) -> Vec<f32> {
        let seed = hash64(text.as_bytes());
        let mut v: Vec<f32> = (0..self.dimension)
            .map(|idx| {
                let mixed = splitmix64(seed ^ (idx as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15));
                // Map to [-1, 1).
                ((mixed >> 11) as f64 / (1u64 << 53) as f64 * 2.0 - 1.0) as f32
            })
            .collect();
        if normalize {
            l2_normalize_in_place(&mut v);
        }
        v
    }
}

impl Encoder for StubEncoder {
    fn encode(&self, texts: &[String], normalize: bool) -> Result<Vec<Vec<f32>>, SemanticError> {
        Ok(texts
            .iter()
            .map(|text| self.embed_one(text, normalize))
            .collect())
    }

    fn embedding_dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn max_seq_length(&self) -> usize {
        self.max_seq_length
    }

    fn is_fallback(&self) -> bool {
        self.fallback
    }
}

fn splitmix64(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
