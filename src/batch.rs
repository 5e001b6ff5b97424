use semantic::Encoder;
use tracing::debug;

use crate::{BatchOutput, PipelineError};

/// Feeds texts to the encoder in contiguous, order-preserving chunks.
///
/// The runner holds no state between calls; concatenating the chunk outputs
/// yields exactly one vector per input, at the input's position.
pub struct BatchRunner<'a> {
    encoder: &'a dyn Encoder,
    chunk_size: usize,
}

impl<'a> BatchRunner<'a> {
    pub fn new(encoder: &'a dyn Encoder, chunk_size: usize) -> Result<Self, PipelineError> {
        if chunk_size == 0 {
            return Err(PipelineError::validation(
                "batch_size",
                "must be a positive integer",
            ));
        }
        Ok(Self {
            encoder,
            chunk_size,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Encode `texts` chunk by chunk. Any chunk failure aborts the whole run.
    pub fn run(&self, texts: &[String], normalize: bool) -> Result<BatchOutput, PipelineError> {
        let mut vectors = Vec::with_capacity(texts.len());
        let mut chunks_processed = 0;

        for chunk in texts.chunks(self.chunk_size) {
            let encoded = self.encoder.encode(chunk, normalize)?;
            if encoded.len() != chunk.len() {
                return Err(PipelineError::Encoding(semantic::SemanticError::Inference(
                    format!(
                        "encoder returned {} vectors for {} inputs",
                        encoded.len(),
                        chunk.len()
                    ),
                )));
            }
            vectors.extend(encoded);
            chunks_processed += 1;
        }

        debug!(
            texts = texts.len(),
            chunk_size = self.chunk_size,
            chunks = chunks_processed,
            "batch encoded"
        );

        Ok(BatchOutput {
            vectors,
            chunks_processed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use semantic::{SemanticError, StubEncoder};
    use std::sync::Mutex;

    fn texts(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("doc-{i}")).collect()
    }

    /// Records chunk sizes and fails on a configured call.
    struct RecordingEncoder {
        calls: Mutex<Vec<usize>>,
        fail_on_call: Option<usize>,
        drop_one: bool,
    }

    impl RecordingEncoder {
        fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                fail_on_call: None,
                drop_one: false,
            }
        }
    }

    impl Encoder for RecordingEncoder {
        fn encode(&self, texts: &[String], _normalize: bool) -> Result<Vec<Vec<f32>>, SemanticError> {
            let mut calls = self.calls.lock().unwrap();
            calls.push(texts.len());
            if self.fail_on_call == Some(calls.len()) {
                return Err(SemanticError::Inference("boom".into()));
            }
            let mut out: Vec<Vec<f32>> = texts.iter().map(|t| vec![t.len() as f32]).collect();
            if self.drop_one {
                out.pop();
            }
            Ok(out)
        }

        fn embedding_dimension(&self) -> usize {
            1
        }

        fn model_name(&self) -> &str {
            "recording"
        }

        fn max_seq_length(&self) -> usize {
            16
        }
    }

    #[test]
    fn zero_chunk_size_rejected() {
        let encoder = RecordingEncoder::new();
        let err = BatchRunner::new(&encoder, 0).err().unwrap();
        assert_eq!(err.field(), Some("batch_size"));
    }

    #[test]
    fn five_inputs_chunk_two_makes_three_calls() {
        let encoder = RecordingEncoder::new();
        let runner = BatchRunner::new(&encoder, 2).unwrap();
        let out = runner.run(&texts(5), true).unwrap();
        assert_eq!(out.chunks_processed, 3);
        assert_eq!(out.vectors.len(), 5);
        assert_eq!(*encoder.calls.lock().unwrap(), vec![2, 2, 1]);
    }

    #[test]
    fn chunking_does_not_change_output() {
        let encoder = StubEncoder::new("stub", 12).unwrap();
        let input = texts(7);
        let one = BatchRunner::new(&encoder, 1).unwrap().run(&input, true).unwrap();
        let all = BatchRunner::new(&encoder, 7).unwrap().run(&input, true).unwrap();
        let big = BatchRunner::new(&encoder, 100).unwrap().run(&input, true).unwrap();
        assert_eq!(one.vectors, all.vectors);
        assert_eq!(all.vectors, big.vectors);
        assert_eq!(one.chunks_processed, 7);
        assert_eq!(all.chunks_processed, 1);
        assert_eq!(big.chunks_processed, 1);
    }

    #[test]
    fn empty_input_makes_no_calls() {
        let encoder = RecordingEncoder::new();
        let out = BatchRunner::new(&encoder, 4).unwrap().run(&[], true).unwrap();
        assert_eq!(out.chunks_processed, 0);
        assert!(out.vectors.is_empty());
        assert!(encoder.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn chunk_failure_aborts_run() {
        let encoder = RecordingEncoder {
            fail_on_call: Some(2),
            ..RecordingEncoder::new()
        };
        let err = BatchRunner::new(&encoder, 2).unwrap().run(&texts(6), true).unwrap_err();
        assert!(matches!(err, PipelineError::Encoding(_)));
        assert_eq!(encoder.calls.lock().unwrap().len(), 2);
    }

    #[test]
    fn short_encoder_output_is_an_error() {
        let encoder = RecordingEncoder {
            drop_one: true,
            ..RecordingEncoder::new()
        };
        let err = BatchRunner::new(&encoder, 3).unwrap().run(&texts(3), false).unwrap_err();
        assert!(err.to_string().contains("2 vectors for 3 inputs"));
    }
}
