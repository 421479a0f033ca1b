//! Layer-wise post-processing of flattened activations.
//!
//! Each step runs independently on every layer's block of columns and returns
//! the rebuilt `(features, layer_ids)` pair, so a custom step may change the
//! number of columns of a layer.

use std::fmt;
use std::sync::Arc;

use langscore_core::util::first_occurrence_order;
use langscore_core::CoreError;

use crate::error::{EncoderError, EncoderResult};
use crate::representations::FeatureMatrix;

/// User-supplied transform of one layer block `[n_samples, layer_width]`.
pub type PostProcessFn = Arc<dyn Fn(&FeatureMatrix) -> EncoderResult<FeatureMatrix> + Send + Sync>;

#[derive(Clone)]
pub enum PostProcessing {
    /// Subtract each column's mean.
    Demean,
    /// Subtract the mean and divide by the population standard deviation.
    DemeanStd,
    /// Rescale each column to [0, 1].
    MinMax,
    Custom { name: String, func: PostProcessFn },
}

impl PostProcessing {
    pub const NAMES: &'static [&'static str] = &["demean", "demean_std", "minmax"];

    pub fn from_name(name: &str) -> EncoderResult<Self> {
        match name {
            "demean" => Ok(Self::Demean),
            "demean_std" => Ok(Self::DemeanStd),
            "minmax" => Ok(Self::MinMax),
            other => Err(EncoderError::Core(CoreError::UnknownName {
                kind: "post-processing",
                name: other.to_string(),
                expected: Self::NAMES.join(", "),
            })),
        }
    }

    pub fn custom(name: impl Into<String>, func: PostProcessFn) -> Self {
        Self::Custom {
            name: name.into(),
            func,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Demean => "demean",
            Self::DemeanStd => "demean_std",
            Self::MinMax => "minmax",
            Self::Custom { name, .. } => name.as_str(),
        }
    }

    /// Name recorded in the cache identity. Custom names are prefixed with
    /// `custom:` so they never collide with a built-in.
    pub fn identity(&self) -> String {
        match self {
            Self::Custom { name, .. } => format!("custom:{name}"),
            builtin => builtin.name().to_string(),
        }
    }

    /// Apply this step to every layer, in first-occurrence layer order.
    pub fn apply(
        &self,
        features: FeatureMatrix,
        layer_ids: Vec<u32>,
    ) -> EncoderResult<(FeatureMatrix, Vec<u32>)> {
        if layer_ids.len() != features.cols() {
            return Err(EncoderError::ShapeMismatch {
                context: format!("{} input layer ids", self.name()),
                expected: vec![features.cols()],
                actual: vec![layer_ids.len()],
            });
        }

        let mut blocks = Vec::new();
        let mut new_ids = Vec::with_capacity(layer_ids.len());
        for layer in first_occurrence_order(&layer_ids) {
            let columns: Vec<usize> = (0..layer_ids.len()).filter(|&c| layer_ids[c] == layer).collect();
            let block = features.select_columns(&columns);
            let out = self.transform(&block)?;
            if out.rows() != block.rows() {
                return Err(EncoderError::ShapeMismatch {
                    context: format!("{} output rows for layer {}", self.name(), layer),
                    expected: vec![block.rows()],
                    actual: vec![out.rows()],
                });
            }
            new_ids.extend(std::iter::repeat(layer).take(out.cols()));
            blocks.push(out);
        }

        Ok((FeatureMatrix::hstack(&blocks)?, new_ids))
    }

    fn transform(&self, block: &FeatureMatrix) -> EncoderResult<FeatureMatrix> {
        match self {
            Self::Demean => Ok(map_columns(block, |column| {
                let mean = column_mean(column);
                column.iter().map(|v| v - mean).collect()
            })),
            Self::DemeanStd => Ok(map_columns(block, |column| {
                let mean = column_mean(column);
                let var = column.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / column.len() as f64;
                let scale = if var > 0.0 { var.sqrt() } else { 1.0 };
                column.iter().map(|v| (v - mean) / scale).collect()
            })),
            Self::MinMax => Ok(map_columns(block, |column| {
                let min = column.iter().copied().fold(f64::INFINITY, f64::min);
                let max = column.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                let range = if max > min { max - min } else { 1.0 };
                column.iter().map(|v| (v - min) / range).collect()
            })),
            Self::Custom { func, .. } => func(block),
        }
    }
}

impl fmt::Debug for PostProcessing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Custom { name, .. } => f.debug_struct("Custom").field("name", name).finish(),
            other => f.write_str(other.name()),
        }
    }
}

impl PartialEq for PostProcessing {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

fn column_mean(column: &[f64]) -> f64 {
    if column.is_empty() {
        0.0
    } else {
        column.iter().sum::<f64>() / column.len() as f64
    }
}

/// Apply `f` to every column (as `f64`), preserving the block shape.
fn map_columns(block: &FeatureMatrix, f: impl Fn(&[f64]) -> Vec<f64>) -> FeatureMatrix {
    let (rows, cols) = (block.rows(), block.cols());
    let mut out = block.clone();
    for c in 0..cols {
        let column: Vec<f64> = (0..rows).map(|r| block.get(r, c) as f64).collect();
        for (r, v) in f(&column).into_iter().enumerate() {
            out.values_mut()[r * cols + c] = v as f32;
        }
    }
    out
}
