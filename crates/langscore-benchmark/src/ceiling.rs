//! Split-half reliability ceiling.
//!
//! The ceiling estimates how well one half of the recorded population predicts
//! the other half. Each repetition draws floor(n/2) of the distinct values of
//! the split coordinate as half A (the rest is half B), averages the assembly
//! over the split dimension within each half, scores the two half-means
//! against each other and applies the Spearman-Brown correction. The median
//! over repetitions is the ceiling; the per-repetition series is kept as the
//! `raw` attribute.
//!
//! All repetitions draw from one seeded `ChaCha8Rng` stream, so repeated runs
//! with the same seed, split count and coordinate reproduce the exact halves.

use std::collections::BTreeSet;
use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};

use langscore_core::config::CeilingConfig;
use langscore_core::util::{first_occurrence_order, median};
use langscore_core::{Metric, NeuralAssembly, Score, ScoreAttr, ATTR_RAW};

use crate::error::{BenchmarkError, BenchmarkResult};

/// Spearman-Brown correction for a half-size sample: `2c / (1 + c)`.
#[inline]
pub fn spearman_brown(consistency: f64) -> f64 {
    2.0 * consistency / (1.0 + consistency)
}

/// Split-half consistency ceiling estimator.
#[derive(Clone)]
pub struct SplitHalvesConsistency {
    num_splits: usize,
    split_coordinate: String,
    consistency_metric: Arc<dyn Metric>,
    seed: u64,
}

impl std::fmt::Debug for SplitHalvesConsistency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SplitHalvesConsistency")
            .field("num_splits", &self.num_splits)
            .field("split_coordinate", &self.split_coordinate)
            .field("consistency_metric", &self.consistency_metric.name())
            .field("seed", &self.seed)
            .finish()
    }
}

impl SplitHalvesConsistency {
    pub const DEFAULT_SEED: u64 = 0;

    /// Create an estimator with the default seed.
    ///
    /// # Errors
    ///
    /// [`BenchmarkError::InvalidConfig`] when `num_splits` is zero.
    pub fn new(
        num_splits: usize,
        split_coordinate: impl Into<String>,
        consistency_metric: Arc<dyn Metric>,
    ) -> BenchmarkResult<Self> {
        if num_splits == 0 {
            return Err(BenchmarkError::InvalidConfig(
                "num_splits must be greater than 0".into(),
            ));
        }
        Ok(Self {
            num_splits,
            split_coordinate: split_coordinate.into(),
            consistency_metric,
            seed: Self::DEFAULT_SEED,
        })
    }

    /// Build from the `[ceiling]` configuration section.
    pub fn from_config(
        config: &CeilingConfig,
        consistency_metric: Arc<dyn Metric>,
    ) -> BenchmarkResult<Self> {
        Ok(Self::new(config.num_splits, config.split_coordinate.clone(), consistency_metric)?
            .with_seed(config.seed))
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn num_splits(&self) -> usize {
        self.num_splits
    }

    pub fn split_coordinate(&self) -> &str {
        &self.split_coordinate
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Estimate the ceiling of `assembly`.
    ///
    /// # Errors
    ///
    /// - [`langscore_core::CoreError::CoordinateNotFound`] / `AmbiguousCoordinate`
    ///   if the split coordinate is not on exactly one dimension
    /// - [`BenchmarkError::InsufficientGroups`] for fewer than two distinct values
    /// - any error the consistency metric raises
    pub fn compute(&self, assembly: &NeuralAssembly) -> BenchmarkResult<Score> {
        let split_dim = assembly.coordinate_dim(&self.split_coordinate)?;
        let split_values = first_occurrence_order(assembly.coordinate(&self.split_coordinate)?);
        if split_values.len() < 2 {
            return Err(BenchmarkError::InsufficientGroups {
                coordinate: self.split_coordinate.clone(),
                found: split_values.len(),
            });
        }

        info!(
            coordinate = %self.split_coordinate,
            dim = %split_dim,
            groups = split_values.len(),
            splits = self.num_splits,
            seed = self.seed,
            "Estimating split-half ceiling"
        );

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let half_size = split_values.len() / 2;
        let mut consistencies = Vec::with_capacity(self.num_splits);

        for split in 0..self.num_splits {
            let half_a: BTreeSet<&str> = split_values
                .choose_multiple(&mut rng, half_size)
                .map(String::as_str)
                .collect();
            let half_b: BTreeSet<&str> = split_values
                .iter()
                .map(String::as_str)
                .filter(|value| !half_a.contains(value))
                .collect();

            let mean_a = assembly
                .select_values(&self.split_coordinate, &half_a)?
                .mean_over(split_dim);
            let mean_b = assembly
                .select_values(&self.split_coordinate, &half_b)?
                .mean_over(split_dim);

            let consistency = self.consistency_metric.score(&mean_a, &mean_b)?.value();
            let corrected = spearman_brown(consistency);
            debug!(split, consistency, corrected, "split-half consistency");
            consistencies.push(corrected);
        }

        let undefined = consistencies.iter().filter(|c| c.is_nan()).count();
        if undefined > 0 {
            warn!(
                undefined,
                splits = self.num_splits,
                "Splits with undefined consistency left out of the median"
            );
        }
        let ceiling = median(&consistencies);
        info!(ceiling, "Split-half ceiling estimated");
        Ok(Score::new(ceiling).with_attr(ATTR_RAW, ScoreAttr::Series(consistencies)))
    }
}
