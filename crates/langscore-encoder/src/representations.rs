//! Activation arrays and the cacheable representation bundle.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use langscore_core::util::first_occurrence_order;
use langscore_core::Dataset;

use crate::error::{EncoderError, EncoderResult};

/// Row-major `f32` matrix, rows are samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureMatrix {
    rows: usize,
    cols: usize,
    values: Vec<f32>,
}

impl FeatureMatrix {
    pub fn new(rows: usize, cols: usize, values: Vec<f32>) -> EncoderResult<Self> {
        if values.len() != rows * cols {
            return Err(EncoderError::ShapeMismatch {
                context: "feature matrix values".to_string(),
                expected: vec![rows * cols],
                actual: vec![values.len()],
            });
        }
        Ok(Self { rows, cols, values })
    }

    /// Stack equally long rows.
    pub fn from_rows(rows: &[Vec<f32>]) -> EncoderResult<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        let mut values = Vec::with_capacity(rows.len() * cols);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != cols {
                return Err(EncoderError::ShapeMismatch {
                    context: format!("feature row {i}"),
                    expected: vec![cols],
                    actual: vec![row.len()],
                });
            }
            values.extend_from_slice(row);
        }
        Ok(Self {
            rows: rows.len(),
            cols,
            values,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut [f32] {
        &mut self.values
    }

    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.values[row * self.cols + col]
    }

    pub fn row(&self, row: usize) -> &[f32] {
        &self.values[row * self.cols..(row + 1) * self.cols]
    }

    /// Copy of the given columns, in the given order.
    pub fn select_columns(&self, columns: &[usize]) -> FeatureMatrix {
        let mut values = Vec::with_capacity(self.rows * columns.len());
        for r in 0..self.rows {
            let row = self.row(r);
            values.extend(columns.iter().map(|&c| row[c]));
        }
        FeatureMatrix {
            rows: self.rows,
            cols: columns.len(),
            values,
        }
    }

    /// Concatenate blocks with equal row counts along the column axis.
    pub fn hstack(blocks: &[FeatureMatrix]) -> EncoderResult<FeatureMatrix> {
        let rows = blocks.first().map_or(0, |b| b.rows);
        if let Some(bad) = blocks.iter().find(|b| b.rows != rows) {
            return Err(EncoderError::ShapeMismatch {
                context: "hstack row counts".to_string(),
                expected: vec![rows],
                actual: vec![bad.rows],
            });
        }
        let cols = blocks.iter().map(|b| b.cols).sum();
        let mut values = Vec::with_capacity(rows * cols);
        for r in 0..rows {
            for block in blocks {
                values.extend_from_slice(block.row(r));
            }
        }
        Ok(FeatureMatrix { rows, cols, values })
    }
}

/// `[n_samples, n_layers * hidden]` representations with per-column layer ids.
///
/// # Invariants
///
/// - `layer_ids.len() == features.cols()`
/// - `sample_ids.len() == features.rows()`
/// - reattached coordinates have one value per row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivationArray {
    features: FeatureMatrix,
    layer_ids: Vec<u32>,
    sample_ids: Vec<String>,
    stimuli: Vec<String>,
    coords: BTreeMap<String, Vec<String>>,
}

impl ActivationArray {
    pub fn new(
        features: FeatureMatrix,
        layer_ids: Vec<u32>,
        sample_ids: Vec<String>,
    ) -> EncoderResult<Self> {
        if layer_ids.len() != features.cols() {
            return Err(EncoderError::ShapeMismatch {
                context: "layer ids vs feature columns".to_string(),
                expected: vec![features.cols()],
                actual: vec![layer_ids.len()],
            });
        }
        if sample_ids.len() != features.rows() {
            return Err(EncoderError::ShapeMismatch {
                context: "sample ids vs feature rows".to_string(),
                expected: vec![features.rows()],
                actual: vec![sample_ids.len()],
            });
        }
        Ok(Self {
            features,
            layer_ids,
            sample_ids,
            stimuli: Vec::new(),
            coords: BTreeMap::new(),
        })
    }

    /// Reattach stimuli and per-sample coordinates from `dataset`.
    ///
    /// Rows must already be in dataset order.
    pub fn with_metadata(mut self, dataset: &Dataset) -> EncoderResult<Self> {
        if dataset.sample_ids() != self.sample_ids.as_slice() {
            return Err(EncoderError::ShapeMismatch {
                context: format!("sample ids of dataset '{}'", dataset.identifier()),
                expected: vec![dataset.len()],
                actual: vec![self.sample_ids.len()],
            });
        }
        self.stimuli = dataset.stimuli().to_vec();
        self.coords = dataset.coords().clone();
        Ok(self)
    }

    /// `(rows, cols)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.features.rows(), self.features.cols())
    }

    pub fn features(&self) -> &FeatureMatrix {
        &self.features
    }

    pub fn layer_ids(&self) -> &[u32] {
        &self.layer_ids
    }

    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    pub fn stimuli(&self) -> &[String] {
        &self.stimuli
    }

    pub fn coords(&self) -> &BTreeMap<String, Vec<String>> {
        &self.coords
    }

    pub fn coord(&self, name: &str) -> Option<&[String]> {
        self.coords.get(name).map(Vec::as_slice)
    }

    /// Distinct layer ids in first-occurrence order.
    pub fn layers(&self) -> Vec<u32> {
        first_occurrence_order(&self.layer_ids)
    }

    pub fn layer_columns(&self, layer: u32) -> Vec<usize> {
        self.layer_ids
            .iter()
            .enumerate()
            .filter(|(_, id)| **id == layer)
            .map(|(c, _)| c)
            .collect()
    }

    /// The columns belonging to `layer`.
    pub fn layer(&self, layer: u32) -> FeatureMatrix {
        self.features.select_columns(&self.layer_columns(layer))
    }
}

/// Cacheable bundle of an encoder configuration and its output.
///
/// The identity is the model id plus every configuration parameter; the
/// dataset is recorded for provenance only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncoderRepresentations {
    pub model_id: String,
    pub context_dimension: Option<String>,
    pub bidirectional: bool,
    pub aggregation: String,
    pub postprocessing: Vec<String>,
    pub include_special_tokens: bool,
    pub dataset_identifier: Option<String>,
    pub representations: Option<ActivationArray>,
}

impl EncoderRepresentations {
    /// Deterministic cache key built from the model id and configuration.
    pub fn identifier(&self) -> String {
        let postprocessing = if self.postprocessing.is_empty() {
            "none".to_string()
        } else {
            self.postprocessing.join("+")
        };
        format!(
            "{}_ctx={}_bidir={}_agg={}_pre={}_special={}",
            self.model_id,
            self.context_dimension.as_deref().unwrap_or("none"),
            self.bidirectional,
            self.aggregation,
            postprocessing,
            self.include_special_tokens,
        )
    }

    pub fn is_populated(&self) -> bool {
        self.representations.is_some()
    }
}
