//! Pearson correlation metric.
//!
//! Columns are correlated pairwise across rows. A single-column input
//! broadcasts against every column of the other input, which is how a
//! per-stimulus behavioral prediction is compared with multi-neuroid targets.
//! Rows where either value is NaN are dropped per column.

use crate::assembly::DataMatrix;
use crate::error::{CoreError, CoreResult};
use crate::score::{Score, ScoreAttr};

use super::Metric;

/// Attribute holding the per-column correlations.
pub const ATTR_NEUROID_SCORES: &str = "neuroid_scores";

/// Mean per-column Pearson r.
#[derive(Debug, Clone, Copy, Default)]
pub struct PearsonCorrelation;

impl PearsonCorrelation {
    pub const NAME: &'static str = "pearsonr";
}

impl Metric for PearsonCorrelation {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn score(&self, predictions: &DataMatrix, targets: &DataMatrix) -> CoreResult<Score> {
        if predictions.rows() != targets.rows() {
            return Err(CoreError::ShapeMismatch {
                context: "pearsonr rows".to_string(),
                expected: vec![targets.rows(), targets.cols()],
                actual: vec![predictions.rows(), predictions.cols()],
            });
        }
        let cols = match (predictions.cols(), targets.cols()) {
            (a, b) if a == b => a,
            (1, b) => b,
            (a, 1) => a,
            (a, b) => {
                return Err(CoreError::ShapeMismatch {
                    context: "pearsonr columns".to_string(),
                    expected: vec![targets.rows(), b],
                    actual: vec![predictions.rows(), a],
                })
            }
        };
        if cols == 0 {
            return Err(CoreError::EmptyInput("pearsonr needs at least one column".into()));
        }

        let per_column: Vec<f64> = (0..cols)
            .map(|c| {
                let p = predictions.column(c.min(predictions.cols() - 1));
                let t = targets.column(c.min(targets.cols() - 1));
                pearson_r(&p, &t)
            })
            .collect();

        let finite: Vec<f64> = per_column.iter().copied().filter(|r| r.is_finite()).collect();
        let value = if finite.is_empty() {
            f64::NAN
        } else {
            finite.iter().sum::<f64>() / finite.len() as f64
        };

        Ok(Score::new(value).with_attr(ATTR_NEUROID_SCORES, ScoreAttr::Series(per_column)))
    }
}

/// Pearson correlation of two equally long slices.
///
/// Pairs containing NaN are skipped. Returns NaN for fewer than two pairs or
/// zero variance.
pub fn pearson_r(a: &[f64], b: &[f64]) -> f64 {
    let pairs: Vec<(f64, f64)> = a
        .iter()
        .zip(b.iter())
        .filter(|(x, y)| !x.is_nan() && !y.is_nan())
        .map(|(x, y)| (*x, *y))
        .collect();
    if pairs.len() < 2 {
        return f64::NAN;
    }

    let n = pairs.len() as f64;
    let mean_a = pairs.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_b = pairs.iter().map(|(_, y)| y).sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (x, y) in &pairs {
        let dx = x - mean_a;
        let dy = y - mean_b;
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }

    let denom = (var_a * var_b).sqrt();
    if denom < f64::EPSILON {
        f64::NAN
    } else {
        (cov / denom).clamp(-1.0, 1.0)
    }
}
