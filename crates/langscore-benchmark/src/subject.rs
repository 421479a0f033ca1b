//! Candidate ("artificial subject") interface.
//!
//! A benchmark first tells the candidate which task to perform, then hands it
//! the stimulus sequence. The candidate answers with one behavioral value per
//! stimulus, in stimulus order.

use serde::{Deserialize, Serialize};

use langscore_core::DataMatrix;

use crate::error::BenchmarkResult;

/// Behavioral tasks a benchmark can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BehavioralTask {
    /// Predict the next word after each stimulus.
    NextWord,
    /// Predict per-word reading times.
    ReadingTimes,
}

impl BehavioralTask {
    pub fn as_str(&self) -> &'static str {
        match self {
            BehavioralTask::NextWord => "next_word",
            BehavioralTask::ReadingTimes => "reading_times",
        }
    }
}

impl std::fmt::Display for BehavioralTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Behavior produced by a candidate for a stimulus sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectOutput {
    stimuli: Vec<String>,
    behavior: Vec<f64>,
}

impl SubjectOutput {
    pub fn new(stimuli: Vec<String>, behavior: Vec<f64>) -> Self {
        Self { stimuli, behavior }
    }

    pub fn stimuli(&self) -> &[String] {
        &self.stimuli
    }

    /// One value per stimulus, in stimulus order.
    pub fn behavior(&self) -> &[f64] {
        &self.behavior
    }

    pub fn len(&self) -> usize {
        self.behavior.len()
    }

    pub fn is_empty(&self) -> bool {
        self.behavior.is_empty()
    }

    /// Behavior as a single-column matrix over samples.
    pub fn to_matrix(&self) -> DataMatrix {
        DataMatrix::column_vector(self.behavior.clone(), "sample")
    }
}

/// A model under evaluation.
pub trait ArtificialSubject {
    /// Identifier used in logs and reports.
    fn identifier(&self) -> &str;

    /// Prepare for `task`. Called once before [`ArtificialSubject::digest_text`].
    fn perform_behavioral_task(&mut self, task: BehavioralTask) -> BenchmarkResult<()>;

    /// Process `stimuli` in order and report one behavioral value per stimulus.
    fn digest_text(&mut self, stimuli: &[String]) -> BenchmarkResult<SubjectOutput>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_names() {
        assert_eq!(BehavioralTask::ReadingTimes.to_string(), "reading_times");
        assert_eq!(
            serde_json::to_string(&BehavioralTask::NextWord).unwrap(),
            "\"next_word\""
        );
    }

    #[test]
    fn test_output_matrix_is_column() {
        let output = SubjectOutput::new(vec!["a".into(), "b".into()], vec![0.5, 1.5]);
        let matrix = output.to_matrix();
        assert_eq!((matrix.rows(), matrix.cols()), (2, 1));
        assert_eq!(matrix.column(0), vec![0.5, 1.5]);
    }
}
