//! Ceiling-normalized benchmarks.

use std::sync::{Arc, OnceLock};

use tracing::{info, warn};

use langscore_core::{
    Dim, Metric, NeuralAssembly, Score, ScoreAttr, ATTR_CEILING, ATTR_OVERSHOOT, ATTR_RAW,
};

use crate::ceiling::SplitHalvesConsistency;
use crate::error::{BenchmarkError, BenchmarkResult};
use crate::subject::{ArtificialSubject, BehavioralTask};

/// A scored comparison between candidates and a recorded dataset.
pub trait Benchmark: Send + Sync {
    fn identifier(&self) -> &str;

    fn version(&self) -> u32;

    /// Benchmark family, e.g. "neural" or "behavior".
    fn parent(&self) -> &str;

    /// Reliability ceiling, computed on first use and memoised.
    fn ceiling(&self) -> BenchmarkResult<&Score>;

    /// Score `candidate`, normalized by [`Benchmark::ceiling`].
    fn score(&self, candidate: &mut dyn ArtificialSubject) -> BenchmarkResult<Score>;
}

/// Divide `raw` by `ceiling`, clamping at 1.
///
/// The result always carries `raw` and `ceiling` attributes. When the ratio
/// exceeds 1 the value becomes exactly 1 and the unclamped ratio is stored as
/// `overshoot`.
pub fn ceiling_normalize(raw: &Score, ceiling: &Score) -> Score {
    if ceiling.value() <= 0.0 {
        warn!(ceiling = ceiling.value(), "Non-positive ceiling, normalized score is not meaningful");
    }
    let ratio = raw.value() / ceiling.value();
    let value = if ratio > 1.0 { 1.0 } else { ratio };

    let mut score = Score::new(value)
        .with_attr(ATTR_RAW, ScoreAttr::Score(Box::new(raw.clone())))
        .with_attr(ATTR_CEILING, ScoreAttr::Score(Box::new(ceiling.clone())));
    if ratio > 1.0 {
        score.set_attr(ATTR_OVERSHOOT, ScoreAttr::Scalar(ratio));
    }
    score
}

/// Pereira et al. 2018 fMRI benchmark at the region-of-interest level.
///
/// Each neuroid is the mean response of the voxels in one language ROI. The
/// candidate's per-sentence reading-time predictions are correlated with the
/// subject-averaged responses.
pub struct Pereira2018RoiBenchmark {
    data: NeuralAssembly,
    metric: Arc<dyn Metric>,
    ceiler: SplitHalvesConsistency,
    ceiling: OnceLock<Score>,
}

impl Pereira2018RoiBenchmark {
    pub const IDENTIFIER: &'static str = "Pereira2018ROI-linregpearsonr";
    pub const DATASET: &'static str = "Pereira2018ROI";
    pub const METRIC: &'static str = "pearsonr";
    pub const STIMULUS_COORDINATE: &'static str = "word";
    pub const SPLIT_COORDINATE: &'static str = "subject_id";
    pub const NUM_SPLITS: usize = 10;

    /// Create the benchmark over `data` scored with `metric`.
    ///
    /// # Errors
    ///
    /// Fails if `data` lacks the sample-level stimulus coordinate.
    pub fn new(data: NeuralAssembly, metric: Arc<dyn Metric>) -> BenchmarkResult<Self> {
        let ceiler =
            SplitHalvesConsistency::new(Self::NUM_SPLITS, Self::SPLIT_COORDINATE, Arc::clone(&metric))?;
        Self::with_ceiler(data, metric, ceiler)
    }

    /// Create the benchmark with a custom ceiling estimator.
    pub fn with_ceiler(
        data: NeuralAssembly,
        metric: Arc<dyn Metric>,
        ceiler: SplitHalvesConsistency,
    ) -> BenchmarkResult<Self> {
        let dim = data.coordinate_dim(Self::STIMULUS_COORDINATE)?;
        if dim != Dim::Sample {
            return Err(BenchmarkError::InvalidConfig(format!(
                "coordinate '{}' must label samples, found on {}",
                Self::STIMULUS_COORDINATE,
                dim
            )));
        }
        Ok(Self {
            data,
            metric,
            ceiler,
            ceiling: OnceLock::new(),
        })
    }

    /// Use a precomputed ceiling instead of estimating it.
    #[must_use]
    pub fn with_ceiling(self, ceiling: Score) -> Self {
        let cell = OnceLock::new();
        let _ = cell.set(ceiling);
        Self {
            ceiling: cell,
            ..self
        }
    }

    pub fn data(&self) -> &NeuralAssembly {
        &self.data
    }

    /// Stimuli in sample order.
    pub fn stimuli(&self) -> BenchmarkResult<&[String]> {
        Ok(self.data.coordinate(Self::STIMULUS_COORDINATE)?)
    }
}

impl std::fmt::Debug for Pereira2018RoiBenchmark {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pereira2018RoiBenchmark")
            .field("shape", &self.data.shape())
            .field("metric", &self.metric.name())
            .field("ceiler", &self.ceiler)
            .field("ceiling", &self.ceiling.get().map(Score::value))
            .finish()
    }
}

impl Benchmark for Pereira2018RoiBenchmark {
    fn identifier(&self) -> &str {
        Self::IDENTIFIER
    }

    fn version(&self) -> u32 {
        1
    }

    fn parent(&self) -> &str {
        "neural"
    }

    fn ceiling(&self) -> BenchmarkResult<&Score> {
        if let Some(ceiling) = self.ceiling.get() {
            return Ok(ceiling);
        }
        let computed = self.ceiler.compute(&self.data)?;
        Ok(self.ceiling.get_or_init(|| computed))
    }

    fn score(&self, candidate: &mut dyn ArtificialSubject) -> BenchmarkResult<Score> {
        info!(
            benchmark = Self::IDENTIFIER,
            candidate = candidate.identifier(),
            "Scoring candidate"
        );
        candidate.perform_behavioral_task(BehavioralTask::ReadingTimes)?;

        let stimuli = self.stimuli()?;
        let output = candidate.digest_text(stimuli)?;
        if output.len() != stimuli.len() {
            return Err(BenchmarkError::PredictionCount {
                benchmark: Self::IDENTIFIER.to_string(),
                expected: stimuli.len(),
                actual: output.len(),
            });
        }

        let predictions = output.to_matrix();
        let targets = self.data.mean_over(Dim::Subject);
        let raw = self.metric.score(&predictions, &targets)?;
        let score = ceiling_normalize(&raw, self.ceiling()?);
        info!(
            benchmark = Self::IDENTIFIER,
            raw = raw.value(),
            score = score.value(),
            "Candidate scored"
        );
        Ok(score)
    }
}
