//! Ceiling command: split-half reliability of an assembly.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Args;
use tracing::info;

use langscore_benchmark::SplitHalvesConsistency;
use langscore_core::{metric_from_name, LangscoreConfig, Metric, NeuralAssembly, PearsonCorrelation};

use super::print_json;

#[derive(Args, Debug)]
pub struct CeilingArgs {
    /// Assembly JSON file
    #[arg(long)]
    pub assembly: PathBuf,

    /// Number of random half splits
    #[arg(long)]
    pub num_splits: Option<usize>,

    /// Coordinate whose values are split into halves
    #[arg(long)]
    pub split_coordinate: Option<String>,

    /// Seed of the split RNG
    #[arg(long)]
    pub seed: Option<u64>,

    /// Consistency metric
    #[arg(long, default_value = PearsonCorrelation::NAME)]
    pub metric: String,
}

pub fn handle_ceiling(args: CeilingArgs, config: &LangscoreConfig) -> anyhow::Result<()> {
    let mut ceiling_config = config.ceiling.clone();
    if let Some(num_splits) = args.num_splits {
        ceiling_config.num_splits = num_splits;
    }
    if let Some(coordinate) = args.split_coordinate {
        ceiling_config.split_coordinate = coordinate;
    }
    if let Some(seed) = args.seed {
        ceiling_config.seed = seed;
    }

    let metric: Arc<dyn Metric> = Arc::from(metric_from_name(&args.metric)?);
    let ceiler = SplitHalvesConsistency::from_config(&ceiling_config, metric)?;
    let assembly = NeuralAssembly::from_json_file(&args.assembly)
        .with_context(|| format!("loading assembly {}", args.assembly.display()))?;

    let ceiling = ceiler.compute(&assembly)?;
    info!(
        ceiling = ceiling.value(),
        splits = ceiler.num_splits(),
        coordinate = ceiler.split_coordinate(),
        "Estimated ceiling"
    );
    print_json(&ceiling)
}
