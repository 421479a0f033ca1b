//! Token-to-stimulus alignment inside a context window.
//!
//! A window is a run of stimuli joined by single spaces. The span of stimulus
//! `i` starts after the tokens of the preceding text and ends after the tokens
//! of the preceding text plus the stimulus, both shifted by the number of
//! leading special tokens. With special tokens kept, the first stimulus of the
//! window also owns the leading markers and the last one the trailing markers.

use std::ops::Range;

use crate::error::{EncoderError, EncoderResult};
use crate::tokenizer::TextTokenizer;

/// Inputs describing one tokenized window.
#[derive(Debug, Clone, Copy)]
pub struct WindowLayout<'a> {
    /// Stimuli making up the window, in order.
    pub stimuli: &'a [String],
    /// Leading special tokens inserted by the tokenizer.
    pub special_token_offset: usize,
    /// Tokens in the window encoded with special tokens.
    pub seq_len: usize,
    /// Attach boundary markers to the first and last stimulus.
    pub include_special_tokens: bool,
}

impl WindowLayout<'_> {
    /// Token span of `self.stimuli[index]`.
    ///
    /// # Errors
    ///
    /// [`EncoderError::TokenAlignment`] when the stimulus owns no tokens of its
    /// own (boundary markers do not count) or the span extends past the window.
    pub fn span<T: TextTokenizer + ?Sized>(&self, tokenizer: &T, index: usize) -> EncoderResult<Range<usize>> {
        let stimulus = self.stimuli.get(index).ok_or_else(|| EncoderError::TokenAlignment {
            index,
            stimulus: String::new(),
            start: 0,
            end: 0,
            seq_len: self.seq_len,
        })?;

        let prefix = self.stimuli[..index].join(" ");
        let through = if prefix.is_empty() {
            stimulus.clone()
        } else {
            format!("{prefix} {stimulus}")
        };

        let mut start = self.special_token_offset + tokenizer.count_tokens(&prefix)?;
        let mut end = self.special_token_offset + tokenizer.count_tokens(&through)?;
        if start >= end {
            return Err(EncoderError::TokenAlignment {
                index,
                stimulus: stimulus.clone(),
                start,
                end,
                seq_len: self.seq_len,
            });
        }
        if self.include_special_tokens {
            if index == 0 {
                start = 0;
            }
            if index + 1 == self.stimuli.len() {
                end = self.seq_len;
            }
        }

        if start >= end || end > self.seq_len {
            return Err(EncoderError::TokenAlignment {
                index,
                stimulus: stimulus.clone(),
                start,
                end,
                seq_len: self.seq_len,
            });
        }
        Ok(start..end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Words longer than 4 characters are split into 4-character pieces,
    /// wrapped in `[CLS]` ... `[SEP]` when special tokens are requested.
    struct Pieces;

    impl TextTokenizer for Pieces {
        fn encode(&self, text: &str, add_special_tokens: bool) -> EncoderResult<Vec<u32>> {
            let mut ids = Vec::new();
            if add_special_tokens {
                ids.push(1);
            }
            for word in text.split_whitespace() {
                let chars: Vec<char> = word.chars().collect();
                ids.extend(chars.chunks(4).map(|c| 100 + c.len() as u32));
            }
            if add_special_tokens {
                ids.push(2);
            }
            Ok(ids)
        }
    }

    fn window(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_spans_without_special_tokens() {
        // "the" | "beekeeper" (3 pieces) | "sat"
        let stimuli = window(&["the", "beekeeper", "sat"]);
        let seq_len = Pieces.encode(&stimuli.join(" "), true).unwrap().len();
        let layout = WindowLayout {
            stimuli: &stimuli,
            special_token_offset: 1,
            seq_len,
            include_special_tokens: false,
        };
        assert_eq!(layout.span(&Pieces, 0).unwrap(), 1..2);
        assert_eq!(layout.span(&Pieces, 1).unwrap(), 2..5);
        assert_eq!(layout.span(&Pieces, 2).unwrap(), 5..6);
    }

    #[test]
    fn test_boundary_markers_attach_to_window_edges() {
        let stimuli = window(&["the", "beekeeper", "sat"]);
        let seq_len = Pieces.encode(&stimuli.join(" "), true).unwrap().len();
        assert_eq!(seq_len, 7);
        let layout = WindowLayout {
            stimuli: &stimuli,
            special_token_offset: 1,
            seq_len,
            include_special_tokens: true,
        };
        assert_eq!(layout.span(&Pieces, 0).unwrap(), 0..2);
        assert_eq!(layout.span(&Pieces, 1).unwrap(), 2..5);
        assert_eq!(layout.span(&Pieces, 2).unwrap(), 5..7);
    }

    #[test]
    fn test_empty_stimulus_is_alignment_error() {
        let stimuli = window(&["the", "", "sat"]);
        let layout = WindowLayout {
            stimuli: &stimuli,
            special_token_offset: 1,
            seq_len: 4,
            include_special_tokens: false,
        };
        assert!(matches!(
            layout.span(&Pieces, 1),
            Err(EncoderError::TokenAlignment { index: 1, .. })
        ));
    }

    #[test]
    fn test_empty_stimulus_at_window_edges_is_alignment_error() {
        for (stimuli, index) in [(window(&["", "sat"]), 0), (window(&["the", ""]), 1)] {
            let seq_len = Pieces.encode(&stimuli.join(" "), true).unwrap().len();
            let layout = WindowLayout {
                stimuli: &stimuli,
                special_token_offset: 1,
                seq_len,
                include_special_tokens: true,
            };
            assert!(
                matches!(
                    layout.span(&Pieces, index),
                    Err(EncoderError::TokenAlignment { index: i, .. }) if i == index
                ),
                "stimulus {index} of {stimuli:?} was accepted"
            );
        }
    }

    #[test]
    fn test_span_past_window_is_alignment_error() {
        let stimuli = window(&["the", "sat"]);
        let layout = WindowLayout {
            stimuli: &stimuli,
            special_token_offset: 1,
            seq_len: 2,
            include_special_tokens: false,
        };
        assert!(layout.span(&Pieces, 1).is_err());
    }
}
