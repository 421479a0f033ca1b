//! Integration tests: dataset fallback, registry wiring and end-to-end scoring.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use langscore_benchmark::{
    load_with_fallback, ArtificialSubject, AssemblyLocator, AssemblySource, Benchmark,
    BehavioralTask, BenchmarkError, BenchmarkResult, FetchError, LocalDiskStore,
    Pereira2018RoiBenchmark, PluginRegistry, SubjectOutput,
};
use langscore_core::{Dim, NeuralAssembly, PearsonCorrelation, Score, ATTR_RAW};

// ===== Fixtures =====

const STIMULI: [&str; 6] = [
    "Beekeeping encourages the conservation of local habitats.",
    "It is in every beekeeper's interest to conserve local plants.",
    "A piano is a large keyboard instrument.",
    "The strings are struck by felt hammers.",
    "Glaciers move slowly down the valley.",
    "Ice at the base melts under pressure.",
];

/// 6 sentences x 2 ROIs x 4 subjects whose responses track sentence length.
fn pereira_like() -> NeuralAssembly {
    let mut values = Vec::new();
    for (s, sentence) in STIMULI.iter().enumerate() {
        let signal = sentence.len() as f64 / 10.0;
        for roi in 0..2 {
            for subject in 0..4 {
                let noise = (((s * 5 + roi * 3 + subject * 7) % 9) as f64 - 4.0) * 0.1;
                values.push(signal * (roi as f64 + 1.0) + noise);
            }
        }
    }
    NeuralAssembly::new([6, 2, 4], values)
        .unwrap()
        .with_coord(Dim::Sample, "word", STIMULI.iter().map(|s| s.to_string()).collect())
        .unwrap()
        .with_coord(Dim::Neuroid, "roi", vec!["LH_AntTemp".into(), "LH_PostTemp".into()])
        .unwrap()
        .with_coord(Dim::Subject, "subject_id", (0..4).map(|j| format!("subj{j}")).collect())
        .unwrap()
}

struct FixedSource {
    result: fn(&AssemblyLocator) -> Result<NeuralAssembly, FetchError>,
    calls: AtomicUsize,
}

impl AssemblySource for FixedSource {
    fn name(&self) -> &str {
        "fixed"
    }

    fn fetch(&self, locator: &AssemblyLocator) -> Result<NeuralAssembly, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.result)(locator)
    }
}

fn not_found(locator: &AssemblyLocator) -> Result<NeuralAssembly, FetchError> {
    Err(FetchError::NotFound {
        identifier: locator.identifier.clone(),
        source_name: "remote".into(),
    })
}

fn unavailable(locator: &AssemblyLocator) -> Result<NeuralAssembly, FetchError> {
    Err(FetchError::Other {
        identifier: locator.identifier.clone(),
        source_name: "remote".into(),
        message: "connection reset".into(),
    })
}

fn write_assembly(dir: &std::path::Path, identifier: &str) {
    let json = serde_json::to_string(&pereira_like()).unwrap();
    std::fs::write(dir.join(format!("{identifier}.json")), json).unwrap();
}

/// Predicts reading time from sentence length, optionally dropping a prediction.
struct LengthSubject {
    task: Option<BehavioralTask>,
    drop_last: bool,
}

impl ArtificialSubject for LengthSubject {
    fn identifier(&self) -> &str {
        "length-baseline"
    }

    fn perform_behavioral_task(&mut self, task: BehavioralTask) -> BenchmarkResult<()> {
        self.task = Some(task);
        Ok(())
    }

    fn digest_text(&mut self, stimuli: &[String]) -> BenchmarkResult<SubjectOutput> {
        assert_eq!(self.task, Some(BehavioralTask::ReadingTimes));
        let mut behavior: Vec<f64> = stimuli.iter().map(|s| s.len() as f64).collect();
        if self.drop_last {
            behavior.pop();
        }
        Ok(SubjectOutput::new(stimuli.to_vec(), behavior))
    }
}

// ===== Fallback =====

#[test]
fn test_fallback_on_not_found_uses_local() {
    let dir = tempfile::tempdir().unwrap();
    write_assembly(dir.path(), "Pereira2018ROI");
    let remote = FixedSource { result: not_found, calls: AtomicUsize::new(0) };
    let local = LocalDiskStore::new(dir.path());

    let assembly =
        load_with_fallback(&remote, &local, &AssemblyLocator::new("Pereira2018ROI")).unwrap();
    assert_eq!(assembly.shape(), [6, 2, 4]);
    assert_eq!(remote.calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_other_remote_error_propagates() {
    let dir = tempfile::tempdir().unwrap();
    write_assembly(dir.path(), "Pereira2018ROI");
    let remote = FixedSource { result: unavailable, calls: AtomicUsize::new(0) };
    let local = LocalDiskStore::new(dir.path());

    let err =
        load_with_fallback(&remote, &local, &AssemblyLocator::new("Pereira2018ROI")).unwrap_err();
    assert!(matches!(err, FetchError::Other { ref message, .. } if message == "connection reset"));
}

#[test]
fn test_registry_dataset_goes_through_remote_first() {
    let dir = tempfile::tempdir().unwrap();
    write_assembly(dir.path(), "Pereira2018ROI");
    let remote = Arc::new(FixedSource { result: not_found, calls: AtomicUsize::new(0) });
    let source: Arc<dyn AssemblySource> = remote.clone();
    let registry = PluginRegistry::with_defaults(dir.path(), Some(source)).unwrap();

    let assembly = registry.load_dataset("Pereira2018_v2022.language").unwrap();
    assert_eq!(assembly.len(Dim::Subject), 4);
    assert_eq!(remote.calls.load(Ordering::SeqCst), 1);
}

// ===== Scoring =====

#[test]
fn test_pereira_scores_length_baseline() {
    let dir = tempfile::tempdir().unwrap();
    write_assembly(dir.path(), "Pereira2018ROI");
    let registry = PluginRegistry::with_defaults(dir.path(), None).unwrap();
    let benchmark = registry.load_benchmark(Pereira2018RoiBenchmark::IDENTIFIER).unwrap();
    assert_eq!(benchmark.version(), 1);
    assert_eq!(benchmark.parent(), "neural");

    let mut subject = LengthSubject { task: None, drop_last: false };
    let score = benchmark.score(&mut subject).unwrap();

    assert!(score.value() <= 1.0);
    let raw = score.raw().unwrap();
    assert!(raw.value() > 0.5, "length baseline should correlate, got {}", raw.value());
    let ceiling = score.ceiling().unwrap();
    assert_eq!(
        ceiling.attr(ATTR_RAW).unwrap().as_series().unwrap().len(),
        Pereira2018RoiBenchmark::NUM_SPLITS
    );
    if raw.value() / ceiling.value() > 1.0 {
        assert_eq!(score.value(), 1.0);
        assert!(score.overshoot().is_some());
    } else {
        assert!(score.overshoot().is_none());
    }
}

#[test]
fn test_ceiling_is_memoised() {
    let benchmark =
        Pereira2018RoiBenchmark::new(pereira_like(), Arc::new(PearsonCorrelation)).unwrap();
    let first = benchmark.ceiling().unwrap() as *const Score;
    let second = benchmark.ceiling().unwrap() as *const Score;
    assert_eq!(first, second);
}

#[test]
fn test_precomputed_ceiling_clamps() {
    let benchmark = Pereira2018RoiBenchmark::new(pereira_like(), Arc::new(PearsonCorrelation))
        .unwrap()
        .with_ceiling(Score::new(0.1));
    let mut subject = LengthSubject { task: None, drop_last: false };
    let score = benchmark.score(&mut subject).unwrap();
    assert_eq!(score.value(), 1.0);
    assert!(score.overshoot().unwrap() > 1.0);
    assert_eq!(score.ceiling().unwrap().value(), 0.1);
}

#[test]
fn test_prediction_count_mismatch_is_error() {
    let benchmark = Pereira2018RoiBenchmark::new(pereira_like(), Arc::new(PearsonCorrelation))
        .unwrap()
        .with_ceiling(Score::new(1.0));
    let mut subject = LengthSubject { task: None, drop_last: true };
    let err = benchmark.score(&mut subject).unwrap_err();
    assert!(matches!(
        err,
        BenchmarkError::PredictionCount { expected: 6, actual: 5, .. }
    ));
}
