//! CLI command handlers
//!
//! # Modules
//!
//! - `encode`: dataset to cached representation bundle
//! - `check`: layer-wise consistency of two cached bundles
//! - `ceiling`: split-half ceiling of an assembly
//! - `score`: stored predictions scored against an assembly

pub mod ceiling;
pub mod check;
pub mod encode;
pub mod score;

use serde::Serialize;

/// Write `value` to stdout as pretty JSON.
pub(crate) fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
