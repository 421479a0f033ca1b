//! Layer-by-layer comparison of two activation arrays.
//!
//! For each layer the per-stimulus difference is computed, then a tolerance is
//! escalated by factors of ten from the initial value until every difference
//! fits. A layer whose reached tolerance exceeds the threshold is unacceptable.
//! NaN differences never fit, so they push a layer to infinite tolerance.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{debug, warn};

use langscore_core::config::ConsistencySettings;
use langscore_core::util::cosine_similarity;
use langscore_core::CoreError;

use crate::error::{EncoderError, EncoderResult};
use crate::representations::{ActivationArray, FeatureMatrix};

/// Relative slack when comparing an escalated tolerance with the threshold,
/// absorbing rounding from repeated multiplication.
const LADDER_SLACK: f64 = 1e-9;

/// Per-stimulus difference measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimilarityMetric {
    /// Largest absolute element difference.
    MaxAbsDiff,
    /// One minus cosine similarity.
    CosineDistance,
}

impl SimilarityMetric {
    /// "tol" and "diff" select [`MaxAbsDiff`](Self::MaxAbsDiff); any name
    /// containing "cos" selects [`CosineDistance`](Self::CosineDistance).
    pub fn from_name(name: &str) -> EncoderResult<Self> {
        match name {
            "tol" | "diff" => Ok(Self::MaxAbsDiff),
            other if other.contains("cos") => Ok(Self::CosineDistance),
            other => Err(EncoderError::Core(CoreError::UnknownName {
                kind: "similarity metric",
                name: other.to_string(),
                expected: "tol, diff, cos".to_string(),
            })),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::MaxAbsDiff => "tol",
            Self::CosineDistance => "cos",
        }
    }

    /// Difference between two rows. Identical rows are always 0.
    pub fn difference(&self, a: &[f32], b: &[f32]) -> f64 {
        if a == b {
            return 0.0;
        }
        match self {
            Self::MaxAbsDiff => a
                .iter()
                .zip(b)
                .map(|(x, y)| (f64::from(*x) - f64::from(*y)).abs())
                .fold(0.0, |acc, d| if d.is_nan() || acc.is_nan() { f64::NAN } else { acc.max(d) }),
            Self::CosineDistance => 1.0 - cosine_similarity(a, b),
        }
    }
}

/// Outcome for one layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerConsistency {
    pub layer: u32,
    /// Smallest escalated tolerance covering every stimulus.
    pub tolerance: f64,
    pub acceptable: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsistencyReport {
    pub all_good: bool,
    /// Sample ids whose difference exceeds the threshold in some layer.
    pub bad_stimuli: BTreeSet<String>,
    pub layers: Vec<LayerConsistency>,
}

/// Compares two arrays of identical shape and sample ids.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsistencyChecker {
    metric: SimilarityMetric,
    initial_tolerance: f64,
    threshold: f64,
}

impl Default for ConsistencyChecker {
    fn default() -> Self {
        Self {
            metric: SimilarityMetric::MaxAbsDiff,
            initial_tolerance: 1e-8,
            threshold: 1e-4,
        }
    }
}

impl ConsistencyChecker {
    pub fn new(metric: SimilarityMetric, initial_tolerance: f64, threshold: f64) -> EncoderResult<Self> {
        if !(initial_tolerance.is_finite() && initial_tolerance > 0.0) {
            return Err(EncoderError::InvalidConfig(format!(
                "initial tolerance must be positive and finite, got {initial_tolerance}"
            )));
        }
        if !threshold.is_finite() || threshold < initial_tolerance {
            return Err(EncoderError::InvalidConfig(format!(
                "threshold {threshold} must be finite and at least the initial tolerance {initial_tolerance}"
            )));
        }
        Ok(Self {
            metric,
            initial_tolerance,
            threshold,
        })
    }

    pub fn from_settings(settings: &ConsistencySettings) -> EncoderResult<Self> {
        Self::new(
            SimilarityMetric::from_name(&settings.metric)?,
            settings.initial_tolerance,
            settings.threshold,
        )
    }

    pub fn metric(&self) -> SimilarityMetric {
        self.metric
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Compare `a` and `b` layer by layer.
    ///
    /// # Errors
    ///
    /// [`EncoderError::ShapeMismatch`] if shapes differ, and
    /// [`EncoderError::InvalidConfig`] if layer ids or sample ids differ.
    pub fn check(&self, a: &ActivationArray, b: &ActivationArray) -> EncoderResult<ConsistencyReport> {
        if a.shape() != b.shape() {
            let (ar, ac) = a.shape();
            let (br, bc) = b.shape();
            return Err(EncoderError::ShapeMismatch {
                context: "consistency check arrays".to_string(),
                expected: vec![ar, ac],
                actual: vec![br, bc],
            });
        }
        if a.sample_ids() != b.sample_ids() {
            return Err(EncoderError::InvalidConfig(
                "consistency check requires identical sample ids in identical order".to_string(),
            ));
        }
        if a.layer_ids() != b.layer_ids() {
            return Err(EncoderError::InvalidConfig(
                "consistency check requires identical layer layouts".to_string(),
            ));
        }

        let mut bad_stimuli = BTreeSet::new();
        let mut layers = Vec::new();
        for layer in a.layers() {
            let diffs = self.differences(&a.layer(layer), &b.layer(layer));
            let tolerance = self.escalate(&diffs);
            let acceptable = tolerance <= self.threshold * (1.0 + LADDER_SLACK);

            if !acceptable {
                let offending: Vec<&String> = diffs
                    .iter()
                    .zip(a.sample_ids())
                    .filter(|(d, _)| d.is_nan() || **d > self.threshold)
                    .map(|(_, id)| id)
                    .collect();
                warn!(
                    layer,
                    tolerance,
                    threshold = self.threshold,
                    offending = offending.len(),
                    "Layer representations differ beyond threshold"
                );
                bad_stimuli.extend(offending.into_iter().cloned());
            } else {
                debug!(layer, tolerance, "Layer consistent");
            }
            layers.push(LayerConsistency {
                layer,
                tolerance,
                acceptable,
            });
        }

        Ok(ConsistencyReport {
            all_good: layers.iter().all(|l| l.acceptable),
            bad_stimuli,
            layers,
        })
    }

    fn differences(&self, a: &FeatureMatrix, b: &FeatureMatrix) -> Vec<f64> {
        (0..a.rows())
            .map(|r| self.metric.difference(a.row(r), b.row(r)))
            .collect()
    }

    fn escalate(&self, diffs: &[f64]) -> f64 {
        if diffs.iter().any(|d| d.is_nan() || d.is_infinite()) {
            return f64::INFINITY;
        }
        let mut tolerance = self.initial_tolerance;
        while tolerance.is_finite() && diffs.iter().any(|&d| d > tolerance) {
            tolerance *= 10.0;
        }
        tolerance
    }
}
