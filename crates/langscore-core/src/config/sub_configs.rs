//! Sub-configuration structures.
//!
//! Each struct maps to one `[section]` of the TOML configuration and carries
//! serde defaults so partial files stay valid.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Print the event target (module path).
    #[serde(default)]
    pub with_target: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            with_target: false,
        }
    }
}

/// Representation cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Try to load a previously persisted bundle before computing.
    #[serde(default = "default_true")]
    pub read_cache: bool,
    /// Persist freshly computed bundles (overwriting stale entries).
    #[serde(default = "default_true")]
    pub write_cache: bool,
    /// Directory holding cached bundles.
    #[serde(default = "default_cache_dir")]
    pub dir: PathBuf,
}

fn default_true() -> bool {
    true
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("./cache/representations")
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            read_cache: true,
            write_cache: true,
            dir: default_cache_dir(),
        }
    }
}

/// Split-half ceiling configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CeilingConfig {
    /// Number of random half splits.
    #[serde(default = "default_num_splits")]
    pub num_splits: usize,
    /// Coordinate whose distinct values are split into halves.
    #[serde(default = "default_split_coordinate")]
    pub split_coordinate: String,
    /// Seed of the split RNG stream.
    #[serde(default)]
    pub seed: u64,
}

fn default_num_splits() -> usize {
    10
}

fn default_split_coordinate() -> String {
    "subject_id".to_string()
}

impl Default for CeilingConfig {
    fn default() -> Self {
        Self {
            num_splits: default_num_splits(),
            split_coordinate: default_split_coordinate(),
            seed: 0,
        }
    }
}

/// Encoder settings as written in configuration files.
///
/// Strategy names stay strings here; the encoder crate parses them into closed
/// enums and rejects unknown names when the encoder is built.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EncoderSettings {
    /// Model identifier recorded in representation bundles.
    #[serde(default = "default_model_id")]
    pub model_id: String,
    /// Dataset coordinate grouping stimuli into shared contexts.
    #[serde(default)]
    pub context_dimension: Option<String>,
    /// Let every stimulus see the whole context group.
    #[serde(default)]
    pub bidirectional: bool,
    /// Token aggregation policy name.
    #[serde(default = "default_aggregation")]
    pub aggregation: String,
    /// Post-processing step names, applied in order.
    #[serde(default)]
    pub postprocessing: Vec<String>,
    /// Keep sequence boundary tokens in stimulus spans.
    #[serde(default = "default_true")]
    pub include_special_tokens: bool,
}

fn default_model_id() -> String {
    "gpt2".to_string()
}

fn default_aggregation() -> String {
    "last".to_string()
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self {
            model_id: default_model_id(),
            context_dimension: None,
            bidirectional: false,
            aggregation: default_aggregation(),
            postprocessing: Vec::new(),
            include_special_tokens: true,
        }
    }
}

/// Representation consistency check settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConsistencySettings {
    /// Similarity metric name ("tol", "diff", "cos").
    #[serde(default = "default_similarity_metric")]
    pub metric: String,
    /// Tolerance the escalation starts from.
    #[serde(default = "default_initial_tolerance")]
    pub initial_tolerance: f64,
    /// Largest tolerance still considered acceptable.
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

fn default_similarity_metric() -> String {
    "tol".to_string()
}

fn default_initial_tolerance() -> f64 {
    1e-8
}

fn default_threshold() -> f64 {
    1e-4
}

impl Default for ConsistencySettings {
    fn default() -> Self {
        Self {
            metric: default_similarity_metric(),
            initial_tolerance: default_initial_tolerance(),
            threshold: default_threshold(),
        }
    }
}

/// Dataset location configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DataConfig {
    /// Directory searched by the local-disk assembly store.
    #[serde(default = "default_data_dir")]
    pub local_dir: PathBuf,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            local_dir: default_data_dir(),
        }
    }
}
