//! Error types for benchmark scoring and ceiling estimation.

use thiserror::Error;

use langscore_core::CoreError;

use crate::data::FetchError;

/// Errors raised while computing ceilings or scoring candidates.
#[derive(Debug, Error)]
pub enum BenchmarkError {
    /// Invalid benchmark or ceiling parameters.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The split coordinate has too few distinct values to form two halves.
    #[error("Coordinate '{coordinate}' has {found} distinct value(s); split halves need at least 2")]
    InsufficientGroups {
        /// Split coordinate name
        coordinate: String,
        /// Number of distinct values present
        found: usize,
    },

    /// The candidate returned a different number of predictions than stimuli.
    #[error("Benchmark '{benchmark}' expected {expected} predictions, candidate returned {actual}")]
    PredictionCount {
        /// Benchmark identifier
        benchmark: String,
        /// Number of stimuli presented
        expected: usize,
        /// Number of predictions returned
        actual: usize,
    },

    /// The candidate failed to perform the task or digest the stimuli.
    #[error("Subject '{subject}' failed: {message}")]
    Subject {
        /// Candidate identifier
        subject: String,
        /// Failure description
        message: String,
    },

    /// Dataset could not be fetched.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Data model, metric or registry failure.
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Result type alias for benchmark operations.
pub type BenchmarkResult<T> = Result<T, BenchmarkError>;
