//! langscore CLI
//!
//! # Commands
//!
//! - `encode`: extract layer-wise representations of a dataset and cache them
//! - `check`: compare two cached representation bundles layer by layer
//! - `ceiling`: estimate the split-half reliability ceiling of an assembly
//! - `score-file`: score stored predictions against an assembly
//!
//! Results go to stdout as JSON, logs go to stderr. Exit code 0 on success,
//! 1 on any error.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::fmt::time::uptime;
use tracing_subscriber::{fmt, EnvFilter};

use langscore_core::config::LoggingConfig;
use langscore_core::LangscoreConfig;

mod commands;

/// langscore - score language models against recorded brain activity
#[derive(Parser)]
#[command(name = "langscore")]
#[command(version)]
#[command(about = "Encode stimuli, check representation consistency and score candidates")]
#[command(propagate_version = true)]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Configuration file; defaults to config/default.toml layered with the
    /// LANGSCORE_ENV file and LANGSCORE__* variables
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode a dataset into cached layer-wise representations
    Encode(commands::encode::EncodeArgs),
    /// Compare two cached representation bundles
    Check(commands::check::CheckArgs),
    /// Estimate the split-half ceiling of an assembly
    Ceiling(commands::ceiling::CeilingArgs),
    /// Score stored predictions against an assembly
    ScoreFile(commands::score::ScoreFileArgs),
}

fn main() {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e:#}");
            std::process::exit(1);
        }
    };
    init_logging(cli.verbose, &config.logging);

    let result = match cli.command {
        Commands::Encode(args) => commands::encode::handle_encode(args, &config),
        Commands::Check(args) => commands::check::handle_check(args, &config),
        Commands::Ceiling(args) => commands::ceiling::handle_ceiling(args, &config),
        Commands::ScoreFile(args) => commands::score::handle_score_file(args, &config),
    };

    if let Err(e) = result {
        error!("{e:#}");
        std::process::exit(1);
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<LangscoreConfig> {
    match path {
        Some(path) => LangscoreConfig::from_file(path)
            .with_context(|| format!("loading configuration from {}", path.display())),
        None => LangscoreConfig::load().context("loading layered configuration"),
    }
}

fn init_logging(verbose: u8, logging: &LoggingConfig) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level)),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    fmt()
        .with_env_filter(filter)
        .with_target(logging.with_target)
        .with_level(true)
        .with_timer(uptime())
        .with_writer(std::io::stderr)
        .init();
}
