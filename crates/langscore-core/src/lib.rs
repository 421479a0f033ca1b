//! langscore core library
//!
//! Data model shared by the benchmark and encoder crates.
//!
//! # Architecture
//!
//! This crate defines:
//! - Stimulus datasets (`Dataset`) and labeled neural recordings (`NeuralAssembly`)
//! - Scores with named attributes (`Score`, `ScoreAttr`)
//! - The `Metric` trait and the built-in Pearson correlation
//! - String-keyed registries (`Registry`)
//! - Error types, result aliases and configuration structures
//!
//! # Example
//!
//! ```
//! use langscore_core::{DataMatrix, Metric, PearsonCorrelation};
//!
//! let predictions = DataMatrix::column_vector(vec![1.0, 2.0, 3.0], "sample");
//! let targets = DataMatrix::column_vector(vec![2.0, 4.0, 6.0], "sample");
//! let score = PearsonCorrelation.score(&predictions, &targets).unwrap();
//! assert!((score.value() - 1.0).abs() < 1e-12);
//! ```

pub mod assembly;
pub mod config;
pub mod dataset;
pub mod error;
pub mod metrics;
pub mod registry;
pub mod score;
pub mod util;

// Re-exports for convenience
pub use assembly::{DataMatrix, Dim, NeuralAssembly};
pub use config::LangscoreConfig;
pub use dataset::Dataset;
pub use error::{CoreError, CoreResult};
pub use metrics::{metric_from_name, Metric, PearsonCorrelation};
pub use registry::Registry;
pub use score::{Score, ScoreAttr, ATTR_CEILING, ATTR_OVERSHOOT, ATTR_RAW};
