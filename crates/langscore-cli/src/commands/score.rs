//! Score-file command: stored predictions against the Pereira2018 ROI benchmark.
//!
//! The predictions file is a serialized `SubjectOutput`:
//!
//! ```json
//! { "stimuli": ["The beekeeper sat.", "..."], "behavior": [0.12, 0.48] }
//! ```
//!
//! An empty `stimuli` list skips the stimulus-order check.

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Args;

use langscore_benchmark::{
    ArtificialSubject, Benchmark, BenchmarkError, BenchmarkResult, BehavioralTask,
    Pereira2018RoiBenchmark, SplitHalvesConsistency, SubjectOutput,
};
use langscore_core::{LangscoreConfig, Metric, PearsonCorrelation, Score};

use super::print_json;

#[derive(Args, Debug)]
pub struct ScoreFileArgs {
    /// Predictions JSON file
    #[arg(long)]
    pub predictions: PathBuf,

    /// Assembly JSON file
    #[arg(long)]
    pub assembly: PathBuf,

    /// Use this ceiling instead of estimating it
    #[arg(long)]
    pub ceiling: Option<f64>,
}

/// Candidate that replays precomputed behavior.
pub(crate) struct ReplaySubject {
    identifier: String,
    output: SubjectOutput,
}

impl ReplaySubject {
    pub(crate) fn new(identifier: impl Into<String>, output: SubjectOutput) -> Self {
        Self {
            identifier: identifier.into(),
            output,
        }
    }
}

impl ArtificialSubject for ReplaySubject {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn perform_behavioral_task(&mut self, _task: BehavioralTask) -> BenchmarkResult<()> {
        Ok(())
    }

    fn digest_text(&mut self, stimuli: &[String]) -> BenchmarkResult<SubjectOutput> {
        if !self.output.stimuli().is_empty() && self.output.stimuli() != stimuli {
            return Err(BenchmarkError::Subject {
                subject: self.identifier.clone(),
                message: "recorded stimuli differ from the benchmark's stimulus order".to_string(),
            });
        }
        Ok(SubjectOutput::new(stimuli.to_vec(), self.output.behavior().to_vec()))
    }
}

pub fn handle_score_file(args: ScoreFileArgs, config: &LangscoreConfig) -> anyhow::Result<()> {
    let file = File::open(&args.predictions)
        .with_context(|| format!("opening predictions {}", args.predictions.display()))?;
    let output: SubjectOutput = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("parsing predictions {}", args.predictions.display()))?;

    let assembly = langscore_core::NeuralAssembly::from_json_file(&args.assembly)
        .with_context(|| format!("loading assembly {}", args.assembly.display()))?;

    let metric: Arc<dyn Metric> = Arc::new(PearsonCorrelation);
    let ceiler = SplitHalvesConsistency::from_config(&config.ceiling, Arc::clone(&metric))?;
    let mut benchmark = Pereira2018RoiBenchmark::with_ceiler(assembly, metric, ceiler)?;
    if let Some(ceiling) = args.ceiling {
        benchmark = benchmark.with_ceiling(Score::new(ceiling));
    }

    let identifier = args
        .predictions
        .file_stem()
        .map_or_else(|| "predictions".to_string(), |s| s.to_string_lossy().into_owned());
    let mut subject = ReplaySubject::new(identifier, output);
    let score = benchmark.score(&mut subject)?;
    print_json(&score)
}
