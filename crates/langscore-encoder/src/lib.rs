//! langscore encoder library
//!
//! Extracts layer-wise, context-aware representations of text stimuli from a
//! sequence model and keeps them in a persistent cache.
//!
//! # Architecture
//!
//! - `tokenizer` / `model`: the inference seams (`TextTokenizer`, `HiddenStateModel`)
//! - `alignment` / `context`: stimulus token spans and in-context encoding
//! - `aggregation` / `postprocess`: per-span and per-layer transforms
//! - `encoder`: the `LayerwiseEncoder` pipeline
//! - `cache`: `RepresentationCache` and the bincode `DiskCache`
//! - `consistency` / `analysis`: comparing and describing activation arrays

pub mod aggregation;
pub mod alignment;
pub mod analysis;
pub mod cache;
pub mod config;
pub mod consistency;
pub mod context;
pub mod encoder;
pub mod error;
pub mod model;
pub mod postprocess;
pub mod representations;
pub mod tokenizer;

pub use aggregation::{AggregateFn, AggregationPolicy};
pub use analysis::{layer_sparsity, LayerSparsity};
pub use cache::{CacheError, DiskCache, MemoryCache, RepresentationCache};
pub use config::EncoderConfig;
pub use consistency::{ConsistencyChecker, ConsistencyReport, LayerConsistency, SimilarityMetric};
pub use context::{context_groups, encode_stimuli_in_context, ContextGroup, LayerwiseEncoding};
pub use encoder::{EncodeOptions, LayerwiseEncoder};
pub use error::{EncoderError, EncoderResult};
pub use model::{EmbeddingBaselineModel, HiddenStateModel};
pub use postprocess::{PostProcessFn, PostProcessing};
pub use representations::{ActivationArray, EncoderRepresentations, FeatureMatrix};
pub use tokenizer::{load_tokenizer, special_token_offset, TextTokenizer};
