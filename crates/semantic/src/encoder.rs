use crate::SemanticError;

/// Opaque text → vector capability shared by every request.
///
/// Implementations are loaded once at startup and are read-only afterwards, so
/// they can sit behind an `Arc` and be called from any thread.
pub trait Encoder: Send + Sync {
    /// Encodes `texts` into one vector each, in input order.
    ///
    /// With `normalize` set every returned vector has unit L2 norm (zero vectors excepted).
    fn encode(&self, texts: &[String], normalize: bool) -> Result<Vec<Vec<f32>>, SemanticError>;

    /// Output dimension, fixed at load time.
    fn embedding_dimension(&self) -> usize;

    /// Model label surfaced on responses.
    fn model_name(&self) -> &str;

    /// Maximum number of tokens considered per input.
    fn max_seq_length(&self) -> usize;

    /// True when this encoder stands in for a model that could not be loaded.
    fn is_fallback(&self) -> bool {
        false
    }
}
