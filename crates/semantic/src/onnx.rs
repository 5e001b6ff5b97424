use std::fmt::Display;
use std::sync::Mutex;

use ndarray::{Array2, Axis};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use tokenizers::{Tokenizer, TruncationParams};
use tracing::info;

use crate::assets::ModelAssets;
use crate::normalize::l2_normalize_in_place;
use crate::{Encoder, EncoderConfig, SemanticError};

/// Sentence-transformer encoder backed by ONNX Runtime.
///
/// Inputs are tokenized, truncated to `max_seq_length` (special tokens
/// included, so `[SEP]` survives), padded to the longest
/// sequence in the call, and mean-pooled over the attention mask. The session
/// sits behind a mutex because `Session::run` needs exclusive access.
pub struct OnnxEncoder {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    model_name: String,
    dimension: usize,
    max_seq_length: usize,
}

impl std::fmt::Debug for OnnxEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxEncoder")
            .field("model_name", &self.model_name)
            .field("dimension", &self.dimension)
            .field("max_seq_length", &self.max_seq_length)
            .finish_non_exhaustive()
    }
}

struct EncodedBatch {
    input_ids: Array2<i64>,
    attention_mask: Array2<i64>,
    token_type_ids: Array2<i64>,
    mask: Vec<Vec<i64>>,
}

/// Truncate inside the tokenizer so the post-processor re-adds `[CLS]`/`[SEP]`
/// within the budget. Padding is done per call in [`OnnxEncoder::tokenize`].
fn configure_tokenizer(tokenizer: &mut Tokenizer, max_seq_length: usize) -> Result<(), SemanticError> {
    tokenizer
        .with_truncation(Some(TruncationParams {
            max_length: max_seq_length,
            ..TruncationParams::default()
        }))
        .map_err(inference)?;
    tokenizer.with_padding(None);
    Ok(())
}

impl OnnxEncoder {
    pub(crate) fn load(cfg: &EncoderConfig, assets: &ModelAssets) -> Result<Self, SemanticError> {
        let mut tokenizer = Tokenizer::from_file(&assets.tokenizer_path).map_err(inference)?;
        let max_seq_length = cfg.max_seq_length.max(1);
        configure_tokenizer(&mut tokenizer, max_seq_length)?;

        let session = Session::builder()
            .map_err(inference)?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(inference)?
            .with_intra_threads(cfg.intra_threads.max(1))
            .map_err(inference)?
            .commit_from_file(&assets.model_path)
            .map_err(inference)?;

        let mut encoder = Self {
            session: Mutex::new(session),
            tokenizer,
            model_name: cfg.model_name.clone(),
            dimension: 0,
            max_seq_length,
        };

        // Probe the hidden size instead of trusting the config.
        let probe = encoder.run(&["dimension probe".to_string()])?;
        encoder.dimension = probe.first().map(Vec::len).unwrap_or(0);
        if encoder.dimension == 0 {
            return Err(SemanticError::Inference(
                "model produced an empty embedding during the load probe".into(),
            ));
        }

        info!(
            model = %encoder.model_name,
            dimension = encoder.dimension,
            max_seq_length = encoder.max_seq_length,
            "onnx encoder loaded"
        );
        Ok(encoder)
    }

    fn tokenize(&self, texts: &[String]) -> Result<EncodedBatch, SemanticError> {
        let mut rows: Vec<(Vec<i64>, Vec<i64>)> = Vec::with_capacity(texts.len());
        let mut max_len = 0usize;
        for text in texts {
            let encoding = self
                .tokenizer
                .encode(text.as_str(), true)
                .map_err(inference)?;
            let ids: Vec<i64> = encoding.get_ids().iter().map(|&id| id as i64).collect();
            let mask: Vec<i64> = encoding
                .get_attention_mask()
                .iter()
                .map(|&m| m as i64)
                .collect();
            max_len = max_len.max(ids.len());
            rows.push((ids, mask));
        }
        let max_len = max_len.max(1);

        let batch = rows.len();
        let mut ids_flat = Vec::with_capacity(batch * max_len);
        let mut mask_flat = Vec::with_capacity(batch * max_len);
        let mut masks = Vec::with_capacity(batch);
        for (mut ids, mut mask) in rows {
            ids.resize(max_len, 0);
            mask.resize(max_len, 0);
            ids_flat.extend_from_slice(&ids);
            mask_flat.extend_from_slice(&mask);
            masks.push(mask);
        }

        Ok(EncodedBatch {
            input_ids: Array2::from_shape_vec((batch, max_len), ids_flat).map_err(inference)?,
            attention_mask: Array2::from_shape_vec((batch, max_len), mask_flat)
                .map_err(inference)?,
            token_type_ids: Array2::zeros((batch, max_len)),
            mask: masks,
        })
    }

    fn run(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, SemanticError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let batch = self.tokenize(texts)?;
        let mut session = self
            .session
            .lock()
            .map_err(|_| SemanticError::Inference("onnx session lock poisoned".into()))?;

        let outputs = session
            .run(ort::inputs![
                "input_ids" => Value::from_array(batch.input_ids).map_err(inference)?,
                "attention_mask" => Value::from_array(batch.attention_mask).map_err(inference)?,
                "token_type_ids" => Value::from_array(batch.token_type_ids).map_err(inference)?
            ])
            .map_err(inference)?;

        // [batch, seq_len, hidden]
        let hidden = outputs[0].try_extract_array::<f32>().map_err(inference)?;
        if hidden.ndim() != 3 {
            return Err(SemanticError::Inference(format!(
                "unexpected output shape {:?}, expected [batch, seq_len, hidden]",
                hidden.shape()
            )));
        }

        let mut pooled = Vec::with_capacity(texts.len());
        for (row, mask) in batch.mask.iter().enumerate() {
            let tokens = hidden.index_axis(Axis(0), row);
            let hidden_dim = tokens.shape()[1];
            let mut sum = vec![0.0f32; hidden_dim];
            let mut weight = 0.0f32;
            for (t, &m) in mask.iter().enumerate() {
                if m == 0 {
                    continue;
                }
                weight += 1.0;
                for (j, acc) in sum.iter_mut().enumerate() {
                    *acc += tokens[[t, j]];
                }
            }
            let denom = weight.max(1e-9);
            sum.iter_mut().for_each(|v| *v /= denom);
            pooled.push(sum);
        }
        Ok(pooled)
    }
}

impl Encoder for OnnxEncoder {
    fn encode(&self, texts: &[String], normalize: bool) -> Result<Vec<Vec<f32>>, SemanticError> {
        let mut vectors = self.run(texts)?;
        if vectors.len() != texts.len() {
            return Err(SemanticError::Inference(format!(
                "model returned {} embeddings for {} inputs",
                vectors.len(),
                texts.len()
            )));
        }
        if normalize {
            vectors.iter_mut().for_each(|v| l2_normalize_in_place(v));
        }
        Ok(vectors)
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
}

fn inference<E: Display>(err: E) -> SemanticError {
    SemanticError::Inference(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const WORD_LEVEL: &str = r#"{
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": [],
        "normalizer": null,
        "pre_tokenizer": {"type": "Whitespace"},
        "post_processor": {"type": "BertProcessing", "sep": ["[SEP]", 2], "cls": ["[CLS]", 1]},
        "decoder": null,
        "model": {
            "type": "WordLevel",
            "vocab": {"[UNK]": 0, "[CLS]": 1, "[SEP]": 2, "one": 3, "two": 4, "three": 5, "four": 6},
            "unk_token": "[UNK]"
        }
    }"#;

    #[test]
    fn truncation_keeps_closing_separator() {
        let mut tokenizer: Tokenizer = WORD_LEVEL.parse().unwrap();
        configure_tokenizer(&mut tokenizer, 4).unwrap();

        let encoding = tokenizer.encode("one two three four", true).unwrap();
        assert_eq!(encoding.get_ids(), &[1, 3, 4, 2]);
        assert_eq!(encoding.get_attention_mask(), &[1, 1, 1, 1]);
    }

    #[test]
    fn short_input_is_not_padded_by_tokenizer() {
        let mut tokenizer: Tokenizer = WORD_LEVEL.parse().unwrap();
        configure_tokenizer(&mut tokenizer, 8).unwrap();

        let encoding = tokenizer.encode("one", true).unwrap();
        assert_eq!(encoding.get_ids(), &[1, 3, 2]);
    }
}
