//! Error types for representation extraction.
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | InvalidConfig, UnknownName (via Core) |
//! | Inference | Tokenization, Model, Tensor |
//! | Alignment | TokenAlignment, LayerLayout, ShapeMismatch |
//! | Infrastructure | Cache, Core |
//!
//! Alignment errors abort the whole encoding; no partial arrays are returned.

use thiserror::Error;

use langscore_core::CoreError;

use crate::cache::CacheError;

/// Errors raised while encoding, caching or comparing representations.
#[derive(Debug, Error)]
pub enum EncoderError {
    /// Encoder parameters are inconsistent.
    #[error("Invalid encoder configuration: {0}")]
    InvalidConfig(String),

    /// The tokenizer rejected the input.
    #[error("Tokenization failed for {text:?}: {message}")]
    Tokenization {
        /// Text being tokenized
        text: String,
        /// Tokenizer error message
        message: String,
    },

    /// The model failed to produce hidden states.
    #[error("Model '{model_id}' failed: {message}")]
    Model {
        /// Model identifier
        model_id: String,
        /// Failure description
        message: String,
    },

    /// A stimulus' token span is empty or outside the tokenized window.
    #[error(
        "Token alignment failed for stimulus {index} ({stimulus:?}): span [{start}, {end}) \
         in a sequence of {seq_len} tokens"
    )]
    TokenAlignment {
        /// Position of the stimulus within its context group
        index: usize,
        /// Stimulus text
        stimulus: String,
        /// Span start (inclusive)
        start: usize,
        /// Span end (exclusive)
        end: usize,
        /// Number of tokens in the window
        seq_len: usize,
    },

    /// A stimulus produced a different layer/feature layout than the first one.
    #[error("Stimulus {sample} has layer layout {actual}, expected {expected}")]
    LayerLayout {
        /// Row index in dataset order
        sample: usize,
        /// Layout of the first stimulus
        expected: String,
        /// Offending layout
        actual: String,
    },

    /// Array shapes that must agree do not.
    #[error("Shape mismatch in {context}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        /// Operation that detected the mismatch
        context: String,
        /// Expected shape
        expected: Vec<usize>,
        /// Actual shape
        actual: Vec<usize>,
    },

    /// A tensor operation failed.
    #[error("Tensor operation failed: {message}")]
    Tensor {
        /// candle error message
        message: String,
    },

    /// Cache lookup or persistence failed.
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Data model or configuration failure.
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl From<candle_core::Error> for EncoderError {
    fn from(err: candle_core::Error) -> Self {
        EncoderError::Tensor {
            message: err.to_string(),
        }
    }
}

/// Result type alias for encoder operations.
pub type EncoderResult<T> = Result<T, EncoderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alignment_error_mentions_span() {
        let err = EncoderError::TokenAlignment {
            index: 2,
            stimulus: "sat".to_string(),
            start: 5,
            end: 5,
            seq_len: 4,
        };
        let msg = err.to_string();
        assert!(msg.contains("[5, 5)"));
        assert!(msg.contains("sat"));
    }

    #[test]
    fn test_candle_error_converts() {
        fn fails() -> EncoderResult<()> {
            let t = candle_core::Tensor::zeros((2, 3), candle_core::DType::F32, &candle_core::Device::Cpu)?;
            t.narrow(0, 1, 5)?;
            Ok(())
        }
        assert!(matches!(fails(), Err(EncoderError::Tensor { .. })));
    }

    #[test]
    fn test_core_error_converts() {
        let err: EncoderError = CoreError::CoordinateNotFound("passage".to_string()).into();
        assert!(err.to_string().contains("passage"));
    }
}
