//! Configuration management for langscore.

mod sub_configs;

#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

pub use sub_configs::{
    CacheConfig, CeilingConfig, ConsistencySettings, DataConfig, EncoderSettings, LoggingConfig,
};

/// Main configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LangscoreConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub ceiling: CeilingConfig,
    #[serde(default)]
    pub encoder: EncoderSettings,
    #[serde(default)]
    pub consistency: ConsistencySettings,
    #[serde(default)]
    pub data: DataConfig,
}

impl LangscoreConfig {
    /// Load configuration from files and environment.
    ///
    /// Configuration is loaded in order:
    /// 1. config/default.toml (base settings)
    /// 2. config/{LANGSCORE_ENV}.toml (environment-specific)
    /// 3. Environment variables with LANGSCORE prefix (`LANGSCORE__CEILING__NUM_SPLITS=20`)
    pub fn load() -> CoreResult<Self> {
        let env = std::env::var("LANGSCORE_ENV").unwrap_or_else(|_| "development".to_string());

        let builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{}", env)).required(false))
            .add_source(config::Environment::with_prefix("LANGSCORE").separator("__"));

        let config: LangscoreConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    pub fn from_file(path: &std::path::Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CoreError::ConfigError(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        let config: LangscoreConfig = toml::from_str(&content)
            .map_err(|e| CoreError::ConfigError(format!("Failed to parse config file: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Strategy names (aggregation, post-processing, similarity metric) are
    /// checked by the encoder crate, which owns their vocabularies.
    pub fn validate(&self) -> CoreResult<()> {
        if self.ceiling.num_splits == 0 {
            return Err(CoreError::ConfigError(
                "ceiling.num_splits must be greater than 0".into(),
            ));
        }

        if self.ceiling.split_coordinate.trim().is_empty() {
            return Err(CoreError::ConfigError(
                "ceiling.split_coordinate must not be empty".into(),
            ));
        }

        if self.encoder.model_id.trim().is_empty() {
            return Err(CoreError::ConfigError(
                "encoder.model_id must not be empty".into(),
            ));
        }

        let c = &self.consistency;
        if !(c.initial_tolerance.is_finite() && c.initial_tolerance > 0.0) {
            return Err(CoreError::ConfigError(format!(
                "consistency.initial_tolerance must be a positive number, got {}",
                c.initial_tolerance
            )));
        }
        if !(c.threshold.is_finite() && c.threshold >= c.initial_tolerance) {
            return Err(CoreError::ConfigError(format!(
                "consistency.threshold ({}) must be finite and >= initial_tolerance ({})",
                c.threshold, c.initial_tolerance
            )));
        }

        Ok(())
    }
}
