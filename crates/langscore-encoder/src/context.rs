//! Context groups and in-context encoding.
//!
//! Stimuli sharing a value of the context coordinate are encoded together so
//! later stimuli see the earlier ones (or, bidirectionally, the whole group).
//! Groups follow the first-occurrence order of their labels, and stimuli keep
//! their dataset order inside a group.

use candle_core::Tensor;
use tracing::trace;

use langscore_core::util::first_occurrence_order;
use langscore_core::{CoreError, Dataset};

use crate::aggregation::AggregationPolicy;
use crate::alignment::WindowLayout;
use crate::error::{EncoderError, EncoderResult};
use crate::model::HiddenStateModel;
use crate::tokenizer::TextTokenizer;

/// Stimuli encoded within one shared context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextGroup {
    /// Coordinate value shared by the group (the sample id for singleton groups).
    pub label: String,
    /// Dataset row indices, ascending.
    pub indices: Vec<usize>,
}

/// Partition `dataset` into context groups.
///
/// Without a context dimension every stimulus is its own group.
///
/// # Errors
///
/// [`CoreError::CoordinateNotFound`] if `context_dimension` is not a dataset coordinate.
pub fn context_groups(dataset: &Dataset, context_dimension: Option<&str>) -> EncoderResult<Vec<ContextGroup>> {
    let Some(dimension) = context_dimension else {
        return Ok(dataset
            .sample_ids()
            .iter()
            .enumerate()
            .map(|(i, id)| ContextGroup {
                label: id.clone(),
                indices: vec![i],
            })
            .collect());
    };

    let labels = dataset
        .coord(dimension)
        .ok_or_else(|| CoreError::CoordinateNotFound(dimension.to_string()))?;

    Ok(first_occurrence_order(labels)
        .into_iter()
        .map(|label| {
            let indices = (0..labels.len()).filter(|&i| labels[i] == label).collect();
            ContextGroup { label, indices }
        })
        .collect())
}

/// Per-layer representations of one stimulus, each `[hidden]`.
#[derive(Debug, Clone)]
pub struct LayerwiseEncoding {
    pub layers: Vec<Tensor>,
}

impl LayerwiseEncoding {
    /// Concatenate layers into one row plus the layer id of every column.
    pub fn flatten(&self) -> EncoderResult<(Vec<f32>, Vec<u32>)> {
        let mut values = Vec::new();
        let mut layer_ids = Vec::new();
        for (layer, tensor) in self.layers.iter().enumerate() {
            let row: Vec<f32> = tensor.to_dtype(candle_core::DType::F32)?.to_vec1()?;
            layer_ids.extend(std::iter::repeat(layer as u32).take(row.len()));
            values.extend(row);
        }
        Ok((values, layer_ids))
    }
}

/// Options shared by every window of an encoding run.
#[derive(Debug, Clone, Copy)]
pub struct InContextOptions<'a> {
    pub bidirectional: bool,
    pub include_special_tokens: bool,
    pub special_token_offset: usize,
    pub aggregation: &'a AggregationPolicy,
}

/// Lazily encode each stimulus of a context group, in order.
///
/// The window of stimulus `i` is the stimuli up to and including `i`
/// (unidirectional) or the whole group (bidirectional). Each item runs the
/// model once.
pub fn encode_stimuli_in_context<'a, T, M>(
    stimuli: &'a [String],
    tokenizer: &'a T,
    model: &'a M,
    options: InContextOptions<'a>,
) -> StimuliInContext<'a, T, M>
where
    T: TextTokenizer + ?Sized,
    M: HiddenStateModel + ?Sized,
{
    StimuliInContext {
        stimuli,
        tokenizer,
        model,
        options,
        next: 0,
    }
}

/// Iterator returned by [`encode_stimuli_in_context`].
pub struct StimuliInContext<'a, T: ?Sized, M: ?Sized> {
    stimuli: &'a [String],
    tokenizer: &'a T,
    model: &'a M,
    options: InContextOptions<'a>,
    next: usize,
}

impl<T, M> StimuliInContext<'_, T, M>
where
    T: TextTokenizer + ?Sized,
    M: HiddenStateModel + ?Sized,
{
    fn encode_at(&self, index: usize) -> EncoderResult<LayerwiseEncoding> {
        let window = if self.options.bidirectional {
            self.stimuli
        } else {
            &self.stimuli[..=index]
        };
        let text = window.join(" ");
        let token_ids = self.tokenizer.encode(&text, true)?;

        let layout = WindowLayout {
            stimuli: window,
            special_token_offset: self.options.special_token_offset,
            seq_len: token_ids.len(),
            include_special_tokens: self.options.include_special_tokens,
        };
        let span = layout.span(self.tokenizer, index)?;
        trace!(index, start = span.start, end = span.end, seq_len = token_ids.len(), "stimulus span");

        let hidden_states = self.model.hidden_states(&token_ids, self.options.bidirectional)?;
        let layers = hidden_states
            .iter()
            .enumerate()
            .map(|(layer, states)| -> EncoderResult<Tensor> {
                let (seq_len, hidden) = states.dims2()?;
                if seq_len != token_ids.len() {
                    return Err(EncoderError::ShapeMismatch {
                        context: format!("hidden states of layer {layer}"),
                        expected: vec![token_ids.len(), hidden],
                        actual: vec![seq_len, hidden],
                    });
                }
                let slice = states.narrow(0, span.start, span.len())?;
                self.options.aggregation.aggregate(&slice)
            })
            .collect::<EncoderResult<Vec<_>>>()?;

        Ok(LayerwiseEncoding { layers })
    }
}

impl<T, M> Iterator for StimuliInContext<'_, T, M>
where
    T: TextTokenizer + ?Sized,
    M: HiddenStateModel + ?Sized,
{
    type Item = EncoderResult<LayerwiseEncoding>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.stimuli.len() {
            return None;
        }
        let index = self.next;
        self.next += 1;
        Some(self.encode_at(index))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.stimuli.len() - self.next;
        (remaining, Some(remaining))
    }
}
