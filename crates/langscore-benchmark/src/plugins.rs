//! Registries of metrics, datasets and benchmarks.
//!
//! [`PluginRegistry::with_defaults`] registers the built-in plugins in a fixed
//! order: metrics first, then datasets, then benchmarks, since benchmark
//! factories resolve their dataset and metric through the registry.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use langscore_core::{Metric, NeuralAssembly, PearsonCorrelation, Registry, Score};

use crate::benchmark::{Benchmark, Pereira2018RoiBenchmark};
use crate::data::{load_with_fallback, AssemblyLocator, AssemblySource, LocalDiskStore};
use crate::error::BenchmarkResult;
use crate::subject::ArtificialSubject;

/// Builds a metric.
pub type MetricFactory = Box<dyn Fn() -> Arc<dyn Metric> + Send + Sync>;

/// Loads a dataset.
pub type DatasetFactory = Box<dyn Fn() -> BenchmarkResult<NeuralAssembly> + Send + Sync>;

/// Builds a benchmark, resolving its dependencies through the registry.
pub type BenchmarkFactory =
    Box<dyn Fn(&PluginRegistry) -> BenchmarkResult<Box<dyn Benchmark>> + Send + Sync>;

/// Object-store version pinned for the Pereira2018 ROI assembly.
const PEREIRA_VERSION_ID: &str = "i1XqPs72b82kfzj9kZ9EQwVZjLltmlSz";
const PEREIRA_SHA1: &str = "d1dc23f2157cfcf6f78abf781a92480cd919ad1c";

/// Explicit replacement for process-wide plugin dictionaries.
pub struct PluginRegistry {
    metrics: Registry<MetricFactory>,
    datasets: Registry<DatasetFactory>,
    benchmarks: Registry<BenchmarkFactory>,
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PluginRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            metrics: Registry::new("metric"),
            datasets: Registry::new("dataset"),
            benchmarks: Registry::new("benchmark"),
        }
    }

    /// Registry with the built-in plugins.
    ///
    /// Datasets are read from `data_dir`. When `remote` is given it is tried
    /// first and the local directory is only used for assemblies it lacks.
    pub fn with_defaults(
        data_dir: impl Into<PathBuf>,
        remote: Option<Arc<dyn AssemblySource>>,
    ) -> BenchmarkResult<Self> {
        let mut registry = Self::new();

        // ===== Metrics =====
        registry.register_metric(
            PearsonCorrelation::NAME,
            Box::new(|| Arc::new(PearsonCorrelation) as Arc<dyn Metric>),
        )?;

        // ===== Datasets =====
        let local = Arc::new(LocalDiskStore::new(data_dir));
        let locator = AssemblyLocator::new(Pereira2018RoiBenchmark::DATASET)
            .with_version(PEREIRA_VERSION_ID, PEREIRA_SHA1);
        for key in [Pereira2018RoiBenchmark::DATASET, "Pereira2018_v2022.language"] {
            let local = Arc::clone(&local);
            let remote = remote.clone();
            let locator = locator.clone();
            registry.register_dataset(
                key,
                Box::new(move || {
                    let assembly = match &remote {
                        Some(remote) => load_with_fallback(remote.as_ref(), local.as_ref(), &locator)?,
                        None => local.fetch(&locator)?,
                    };
                    Ok(assembly)
                }),
            )?;
        }

        // ===== Benchmarks =====
        registry.register_benchmark(
            Pereira2018RoiBenchmark::IDENTIFIER,
            Box::new(|plugins: &PluginRegistry| {
                let data = plugins.load_dataset(Pereira2018RoiBenchmark::DATASET)?;
                let metric = plugins.load_metric(Pereira2018RoiBenchmark::METRIC)?;
                Ok(Box::new(Pereira2018RoiBenchmark::new(data, metric)?) as Box<dyn Benchmark>)
            }),
        )?;

        info!(
            metrics = registry.metrics.len(),
            datasets = registry.datasets.len(),
            benchmarks = registry.benchmarks.len(),
            "Plugin registry initialised"
        );
        Ok(registry)
    }

    pub fn register_metric(&mut self, key: impl Into<String>, factory: MetricFactory) -> BenchmarkResult<()> {
        Ok(self.metrics.register(key, factory)?)
    }

    pub fn register_dataset(&mut self, key: impl Into<String>, factory: DatasetFactory) -> BenchmarkResult<()> {
        Ok(self.datasets.register(key, factory)?)
    }

    pub fn register_benchmark(
        &mut self,
        key: impl Into<String>,
        factory: BenchmarkFactory,
    ) -> BenchmarkResult<()> {
        Ok(self.benchmarks.register(key, factory)?)
    }

    pub fn load_metric(&self, key: &str) -> BenchmarkResult<Arc<dyn Metric>> {
        Ok((self.metrics.get(key)?)())
    }

    pub fn load_dataset(&self, key: &str) -> BenchmarkResult<NeuralAssembly> {
        (self.datasets.get(key)?)()
    }

    pub fn load_benchmark(&self, key: &str) -> BenchmarkResult<Box<dyn Benchmark>> {
        (self.benchmarks.get(key)?)(self)
    }

    /// Build benchmark `key` and score `candidate` on it.
    pub fn score(&self, key: &str, candidate: &mut dyn ArtificialSubject) -> BenchmarkResult<Score> {
        self.load_benchmark(key)?.score(candidate)
    }

    pub fn metric_keys(&self) -> impl Iterator<Item = &str> {
        self.metrics.keys()
    }

    pub fn dataset_keys(&self) -> impl Iterator<Item = &str> {
        self.datasets.keys()
    }

    pub fn benchmark_keys(&self) -> impl Iterator<Item = &str> {
        self.benchmarks.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BenchmarkError;
    use langscore_core::CoreError;

    #[test]
    fn test_defaults_register_builtins() {
        let dir = tempfile::tempdir().unwrap();
        let registry = PluginRegistry::with_defaults(dir.path(), None).unwrap();
        assert_eq!(registry.metric_keys().collect::<Vec<_>>(), vec!["pearsonr"]);
        assert!(registry.dataset_keys().any(|k| k == "Pereira2018ROI"));
        assert!(registry.dataset_keys().any(|k| k == "Pereira2018_v2022.language"));
        assert_eq!(
            registry.benchmark_keys().collect::<Vec<_>>(),
            vec!["Pereira2018ROI-linregpearsonr"]
        );
    }

    #[test]
    fn test_duplicate_metric_registration_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = PluginRegistry::with_defaults(dir.path(), None).unwrap();
        let err = registry
            .register_metric("pearsonr", Box::new(|| Arc::new(PearsonCorrelation) as Arc<dyn Metric>))
            .unwrap_err();
        assert!(matches!(err, BenchmarkError::Core(CoreError::DuplicateKey { .. })));
    }

    #[test]
    fn test_unknown_benchmark_fails() {
        let registry = PluginRegistry::new();
        let err = registry.load_benchmark("Futrell2018-pearsonr").err().unwrap();
        assert!(matches!(err, BenchmarkError::Core(CoreError::NotRegistered { .. })));
    }

    #[test]
    fn test_missing_dataset_file_surfaces_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let registry = PluginRegistry::with_defaults(dir.path(), None).unwrap();
        let err = registry.load_dataset("Pereira2018ROI").unwrap_err();
        assert!(matches!(err, BenchmarkError::Fetch(ref e) if e.is_not_found()));
    }
}
