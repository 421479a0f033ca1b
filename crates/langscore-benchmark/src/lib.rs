//! langscore benchmark library
//!
//! Scores artificial subjects against recorded neural data:
//! - `ceiling`: split-half reliability ceiling with Spearman-Brown correction
//! - `benchmark`: the `Benchmark` trait, `ceiling_normalize` and the Pereira2018 ROI benchmark
//! - `subject`: the candidate interface (`ArtificialSubject`, `BehavioralTask`)
//! - `data`: assembly sources with remote-to-local fallback
//! - `plugins`: registries of metrics, datasets and benchmarks

pub mod benchmark;
pub mod ceiling;
pub mod data;
pub mod error;
pub mod plugins;
pub mod subject;

pub use benchmark::{ceiling_normalize, Benchmark, Pereira2018RoiBenchmark};
pub use ceiling::{spearman_brown, SplitHalvesConsistency};
pub use data::{load_with_fallback, AssemblyLocator, AssemblySource, FetchError, LocalDiskStore};
pub use error::{BenchmarkError, BenchmarkResult};
pub use plugins::PluginRegistry;
pub use subject::{ArtificialSubject, BehavioralTask, SubjectOutput};
