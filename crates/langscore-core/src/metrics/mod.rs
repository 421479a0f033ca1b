//! Metrics comparing two aligned matrices.
//!
//! - **pearsonr**: per-column Pearson correlation, averaged across columns

pub mod pearson;

pub use pearson::{pearson_r, PearsonCorrelation};

use crate::assembly::DataMatrix;
use crate::error::{CoreError, CoreResult};
use crate::score::Score;

/// A comparison between two row-aligned matrices.
///
/// Rows are samples in both inputs. Implementations decide how columns pair up
/// and must reject inputs whose row counts differ.
pub trait Metric: Send + Sync {
    /// Registry key for this metric.
    fn name(&self) -> &str;

    /// Compare `predictions` against `targets`.
    fn score(&self, predictions: &DataMatrix, targets: &DataMatrix) -> CoreResult<Score>;
}

/// Names accepted by [`metric_from_name`].
pub const METRIC_NAMES: &[&str] = &[PearsonCorrelation::NAME];

/// Construct a built-in metric by name.
pub fn metric_from_name(name: &str) -> CoreResult<Box<dyn Metric>> {
    match name {
        PearsonCorrelation::NAME => Ok(Box::new(PearsonCorrelation)),
        other => Err(CoreError::UnknownName {
            kind: "metric",
            name: other.to_string(),
            expected: METRIC_NAMES.join(", "),
        }),
    }
}
