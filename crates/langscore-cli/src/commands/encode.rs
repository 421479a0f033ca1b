//! Encode command.
//!
//! Runs the layer-wise encoder over a dataset JSON file with a HuggingFace
//! tokenizer and the embedding-baseline model, then prints a summary of the
//! resulting bundle. Command-line options override the `[encoder]` and
//! `[cache]` configuration sections.
//!
//! ```bash
//! langscore encode --dataset data/stories.json \
//!     --tokenizer tokenizer.json --embeddings embeddings.safetensors \
//!     --context-dimension story_id --postprocessing demean
//! ```

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use serde::Serialize;
use tracing::info;

use langscore_core::{Dataset, LangscoreConfig};
use langscore_encoder::{
    layer_sparsity, load_tokenizer, DiskCache, EmbeddingBaselineModel, EncodeOptions,
    EncoderConfig, LayerSparsity, LayerwiseEncoder,
};

use super::print_json;

/// Arguments for the encode command.
#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Dataset JSON file (identifier, stimuli, sample_ids, coords)
    #[arg(long)]
    pub dataset: PathBuf,

    /// HuggingFace tokenizer.json
    #[arg(long)]
    pub tokenizer: PathBuf,

    /// Safetensors file holding the [vocab, hidden] embedding matrix
    #[arg(long)]
    pub embeddings: PathBuf,

    /// Name of the embedding tensor inside the safetensors file
    #[arg(long, default_value = EmbeddingBaselineModel::EMBEDDING_TENSOR)]
    pub tensor_name: String,

    /// Model identifier recorded in the bundle
    #[arg(long)]
    pub model_id: Option<String>,

    /// Dataset coordinate grouping stimuli into shared contexts
    #[arg(long)]
    pub context_dimension: Option<String>,

    /// Let every stimulus see its whole context group
    #[arg(long)]
    pub bidirectional: bool,

    /// Token aggregation (first, last, mean, sum, median)
    #[arg(long)]
    pub aggregation: Option<String>,

    /// Post-processing step (demean, demean_std, minmax); repeatable
    #[arg(long)]
    pub postprocessing: Vec<String>,

    /// Drop boundary tokens from the first and last stimulus spans
    #[arg(long)]
    pub exclude_special_tokens: bool,

    /// Cache directory
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// Recompute even if a cached bundle exists
    #[arg(long)]
    pub no_read_cache: bool,

    /// Do not persist the computed bundle
    #[arg(long)]
    pub no_write_cache: bool,

    /// Magnitude below which an activation counts as zero in the summary
    #[arg(long, default_value = "1e-6")]
    pub zero_threshold: f32,
}

#[derive(Debug, Serialize)]
struct EncodeSummary {
    identifier: String,
    dataset: Option<String>,
    rows: usize,
    cols: usize,
    layers: Vec<LayerSparsity>,
}

/// Execute the encode command.
pub fn handle_encode(args: EncodeArgs, config: &LangscoreConfig) -> anyhow::Result<()> {
    let mut settings = config.encoder.clone();
    if let Some(model_id) = args.model_id {
        settings.model_id = model_id;
    }
    if args.context_dimension.is_some() {
        settings.context_dimension = args.context_dimension;
    }
    if args.bidirectional {
        settings.bidirectional = true;
    }
    if let Some(aggregation) = args.aggregation {
        settings.aggregation = aggregation;
    }
    if !args.postprocessing.is_empty() {
        settings.postprocessing = args.postprocessing;
    }
    if args.exclude_special_tokens {
        settings.include_special_tokens = false;
    }
    let encoder_config = EncoderConfig::from_settings(&settings)?;

    let dataset = Dataset::from_json_file(&args.dataset)
        .with_context(|| format!("loading dataset {}", args.dataset.display()))?;
    let tokenizer = load_tokenizer(&args.tokenizer)?;
    let model = EmbeddingBaselineModel::from_safetensors(
        encoder_config.model_id.clone(),
        &args.embeddings,
        &args.tensor_name,
    )?;
    info!(
        model_id = %encoder_config.model_id,
        vocab = model.vocab_size(),
        hidden = model.hidden_size(),
        "Loaded model"
    );

    let cache_dir = args.cache_dir.unwrap_or_else(|| config.cache.dir.clone());
    let options = EncodeOptions {
        read_cache: config.cache.read_cache && !args.no_read_cache,
        write_cache: config.cache.write_cache && !args.no_write_cache,
    };

    let encoder =
        LayerwiseEncoder::new(encoder_config, tokenizer, model)?.with_cache(DiskCache::new(&cache_dir));
    let bundle = encoder.encode(&dataset, options)?;

    let array = bundle
        .representations
        .as_ref()
        .context("encoder returned an empty bundle")?;
    let (rows, cols) = array.shape();
    print_json(&EncodeSummary {
        identifier: bundle.identifier(),
        dataset: bundle.dataset_identifier.clone(),
        rows,
        cols,
        layers: layer_sparsity(array, args.zero_threshold),
    })
}
