//! Tokenizer seam.
//!
//! The encoder only needs token ids, with or without the model's special
//! (boundary) tokens. [`TextTokenizer`] is implemented for
//! `tokenizers::Tokenizer` so any HuggingFace `tokenizer.json` plugs in.

use std::path::Path;

use tokenizers::Tokenizer;

use crate::error::{EncoderError, EncoderResult};

/// Probe word used to locate leading special tokens.
pub const OFFSET_PROBE: &str = "brainscore";

/// Text to token ids.
pub trait TextTokenizer {
    fn encode(&self, text: &str, add_special_tokens: bool) -> EncoderResult<Vec<u32>>;

    /// Token count of `text` without special tokens. Empty text has no tokens.
    fn count_tokens(&self, text: &str) -> EncoderResult<usize> {
        if text.is_empty() {
            return Ok(0);
        }
        Ok(self.encode(text, false)?.len())
    }
}

impl TextTokenizer for Tokenizer {
    fn encode(&self, text: &str, add_special_tokens: bool) -> EncoderResult<Vec<u32>> {
        // Deref to the inner implementation so the inherent `encode` is called.
        let encoding = (**self).encode(text, add_special_tokens).map_err(|e| {
            EncoderError::Tokenization {
                text: text.to_string(),
                message: e.to_string(),
            }
        })?;
        Ok(encoding.get_ids().to_vec())
    }
}

/// Load a HuggingFace `tokenizer.json`.
pub fn load_tokenizer(path: &Path) -> EncoderResult<Tokenizer> {
    Tokenizer::from_file(path).map_err(|e| EncoderError::InvalidConfig(format!(
        "tokenizer load failed at {}: {}",
        path.display(),
        e
    )))
}

/// Number of leading special tokens the tokenizer inserts.
///
/// This is the position, in the probe tokenized with special tokens, of the
/// probe's first plain token.
pub fn special_token_offset<T: TextTokenizer + ?Sized>(tokenizer: &T) -> EncoderResult<usize> {
    let with_special = tokenizer.encode(OFFSET_PROBE, true)?;
    let plain = tokenizer.encode(OFFSET_PROBE, false)?;
    let first = plain.first().ok_or_else(|| EncoderError::Tokenization {
        text: OFFSET_PROBE.to_string(),
        message: "probe produced no tokens".to_string(),
    })?;
    with_special
        .iter()
        .position(|id| id == first)
        .ok_or_else(|| EncoderError::Tokenization {
            text: OFFSET_PROBE.to_string(),
            message: "probe tokens missing from special-token encoding".to_string(),
        })
}
