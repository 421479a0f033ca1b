//! Check command: consistency of two cached bundles.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use tracing::{info, warn};

use langscore_core::LangscoreConfig;
use langscore_encoder::{ConsistencyChecker, DiskCache, RepresentationCache};

use super::print_json;

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Cache key of the first bundle
    pub first: String,

    /// Cache key of the second bundle
    pub second: String,

    /// Cache directory holding both bundles
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// Similarity metric (tol, diff, cos)
    #[arg(long)]
    pub metric: Option<String>,

    /// Largest acceptable tolerance
    #[arg(long)]
    pub threshold: Option<f64>,
}

/// Execute the check command. Inconsistent bundles are reported, not errors.
pub fn handle_check(args: CheckArgs, config: &LangscoreConfig) -> anyhow::Result<()> {
    let mut settings = config.consistency.clone();
    if let Some(metric) = args.metric {
        settings.metric = metric;
    }
    if let Some(threshold) = args.threshold {
        settings.threshold = threshold;
    }
    let checker = ConsistencyChecker::from_settings(&settings)?;

    let cache = DiskCache::new(args.cache_dir.unwrap_or_else(|| config.cache.dir.clone()));
    let first = cache.load(&args.first).with_context(|| format!("loading '{}'", args.first))?;
    let second = cache.load(&args.second).with_context(|| format!("loading '{}'", args.second))?;

    let a = first
        .representations
        .as_ref()
        .with_context(|| format!("bundle '{}' holds no representations", args.first))?;
    let b = second
        .representations
        .as_ref()
        .with_context(|| format!("bundle '{}' holds no representations", args.second))?;

    let report = checker.check(a, b)?;
    if report.all_good {
        info!(metric = checker.metric().name(), "Representations consistent");
    } else {
        warn!(
            metric = checker.metric().name(),
            bad_stimuli = report.bad_stimuli.len(),
            "Representations inconsistent"
        );
    }
    print_json(&report)
}
