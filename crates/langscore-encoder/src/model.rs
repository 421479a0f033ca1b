//! Sequence-model seam.
//!
//! [`HiddenStateModel`] is the only thing the encoder asks of an inference
//! engine: one `[seq_len, hidden]` tensor per layer for a token sequence.
//! [`EmbeddingBaselineModel`] is a two-layer bag-of-embeddings baseline backed
//! by a single embedding matrix, enough to run the pipeline without a
//! transformer.

use std::path::Path;

use candle_core::{DType, Device, Tensor};
use tracing::debug;

use crate::error::{EncoderError, EncoderResult};

/// A model exposing per-layer hidden states.
pub trait HiddenStateModel {
    fn model_id(&self) -> &str;

    /// Hidden states for `token_ids`, one `[token_ids.len(), hidden]` tensor per
    /// layer, outermost (embedding) layer first.
    ///
    /// `bidirectional` tells the model whether every position may attend to the
    /// whole sequence.
    fn hidden_states(&self, token_ids: &[u32], bidirectional: bool) -> EncoderResult<Vec<Tensor>>;
}

/// Layer 0: token embeddings. Layer 1: running mean of the embeddings
/// (causal), or the sequence mean at every position (bidirectional).
#[derive(Debug, Clone)]
pub struct EmbeddingBaselineModel {
    model_id: String,
    embeddings: Tensor,
}

impl EmbeddingBaselineModel {
    /// Default tensor name looked up in safetensors files.
    pub const EMBEDDING_TENSOR: &'static str = "embeddings";

    pub fn new(model_id: impl Into<String>, embeddings: Tensor) -> EncoderResult<Self> {
        let model_id = model_id.into();
        if embeddings.rank() != 2 {
            return Err(EncoderError::Model {
                model_id,
                message: format!("embedding matrix must be [vocab, hidden], got {:?}", embeddings.dims()),
            });
        }
        Ok(Self {
            model_id,
            embeddings: embeddings.to_dtype(DType::F32)?,
        })
    }

    /// Load the embedding matrix `tensor_name` from a safetensors file.
    pub fn from_safetensors(
        model_id: impl Into<String>,
        path: &Path,
        tensor_name: &str,
    ) -> EncoderResult<Self> {
        let model_id = model_id.into();
        let mut tensors = candle_core::safetensors::load(path, &Device::Cpu).map_err(|e| {
            EncoderError::Model {
                model_id: model_id.clone(),
                message: format!("failed to load {}: {}", path.display(), e),
            }
        })?;
        let embeddings = tensors.remove(tensor_name).ok_or_else(|| EncoderError::Model {
            model_id: model_id.clone(),
            message: format!("tensor '{}' not found in {}", tensor_name, path.display()),
        })?;
        debug!(model_id = %model_id, shape = ?embeddings.dims(), "Loaded embedding matrix");
        Self::new(model_id, embeddings)
    }

    pub fn vocab_size(&self) -> usize {
        self.embeddings.dims()[0]
    }

    pub fn hidden_size(&self) -> usize {
        self.embeddings.dims()[1]
    }
}

impl HiddenStateModel for EmbeddingBaselineModel {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn hidden_states(&self, token_ids: &[u32], bidirectional: bool) -> EncoderResult<Vec<Tensor>> {
        if token_ids.is_empty() {
            return Err(EncoderError::Model {
                model_id: self.model_id.clone(),
                message: "empty token sequence".to_string(),
            });
        }
        if let Some(bad) = token_ids.iter().find(|&&id| id as usize >= self.vocab_size()) {
            return Err(EncoderError::Model {
                model_id: self.model_id.clone(),
                message: format!("token id {} outside vocabulary of {}", bad, self.vocab_size()),
            });
        }

        let device = self.embeddings.device();
        let seq_len = token_ids.len();
        let ids = Tensor::new(token_ids, device)?;
        let embedded = self.embeddings.index_select(&ids, 0)?;

        let contextual = if bidirectional {
            embedded
                .mean_keepdim(0)?
                .broadcast_as((seq_len, self.hidden_size()))?
                .contiguous()?
        } else {
            let positions = Tensor::arange(1f32, seq_len as f32 + 1.0, device)?.reshape((seq_len, 1))?;
            embedded.cumsum(0)?.broadcast_div(&positions)?
        };

        Ok(vec![embedded, contextual])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> EmbeddingBaselineModel {
        // vocab 3, hidden 2: row i = [i, 10 i]
        let embeddings =
            Tensor::from_vec(vec![0f32, 0.0, 1.0, 10.0, 2.0, 20.0], (3, 2), &Device::Cpu).unwrap();
        EmbeddingBaselineModel::new("baseline", embeddings).unwrap()
    }

    #[test]
    fn test_unidirectional_running_mean() {
        let layers = model().hidden_states(&[1, 2, 0], false).unwrap();
        assert_eq!(layers.len(), 2);
        let ctx: Vec<Vec<f32>> = layers[1].to_vec2().unwrap();
        assert_eq!(ctx[0], vec![1.0, 10.0]);
        assert_eq!(ctx[1], vec![1.5, 15.0]);
        assert_eq!(ctx[2], vec![1.0, 10.0]);
    }

    #[test]
    fn test_bidirectional_sequence_mean() {
        let layers = model().hidden_states(&[1, 2, 0], true).unwrap();
        let ctx: Vec<Vec<f32>> = layers[1].to_vec2().unwrap();
        assert!(ctx.iter().all(|row| row == &vec![1.0, 10.0]));
    }

    #[test]
    fn test_out_of_vocabulary_is_model_error() {
        assert!(matches!(
            model().hidden_states(&[7], false),
            Err(EncoderError::Model { .. })
        ));
    }

    #[test]
    fn test_safetensors_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("baseline.safetensors");
        let embeddings = Tensor::ones((4, 3), DType::F32, &Device::Cpu).unwrap();
        embeddings.save_safetensors(EmbeddingBaselineModel::EMBEDDING_TENSOR, &path).unwrap();

        let loaded = EmbeddingBaselineModel::from_safetensors(
            "baseline",
            &path,
            EmbeddingBaselineModel::EMBEDDING_TENSOR,
        )
        .unwrap();
        assert_eq!((loaded.vocab_size(), loaded.hidden_size()), (4, 3));
    }
}
