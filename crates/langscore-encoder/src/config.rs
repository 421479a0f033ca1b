//! Validated encoder configuration.

use langscore_core::config::EncoderSettings;

use crate::aggregation::AggregationPolicy;
use crate::error::{EncoderError, EncoderResult};
use crate::postprocess::PostProcessing;

/// Everything that determines an encoder's output, and hence its cache key.
#[derive(Debug, Clone, PartialEq)]
pub struct EncoderConfig {
    pub model_id: String,
    pub context_dimension: Option<String>,
    pub bidirectional: bool,
    pub aggregation: AggregationPolicy,
    pub postprocessing: Vec<PostProcessing>,
    pub include_special_tokens: bool,
}

impl EncoderConfig {
    /// Unidirectional, no context grouping, last-token aggregation, special
    /// tokens kept.
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            context_dimension: None,
            bidirectional: false,
            aggregation: AggregationPolicy::Last,
            postprocessing: Vec::new(),
            include_special_tokens: true,
        }
    }

    #[must_use]
    pub fn with_context_dimension(mut self, dimension: impl Into<String>) -> Self {
        self.context_dimension = Some(dimension.into());
        self
    }

    #[must_use]
    pub fn with_bidirectional(mut self, bidirectional: bool) -> Self {
        self.bidirectional = bidirectional;
        self
    }

    #[must_use]
    pub fn with_aggregation(mut self, aggregation: AggregationPolicy) -> Self {
        self.aggregation = aggregation;
        self
    }

    #[must_use]
    pub fn with_postprocessing(mut self, step: PostProcessing) -> Self {
        self.postprocessing.push(step);
        self
    }

    #[must_use]
    pub fn with_special_tokens(mut self, include: bool) -> Self {
        self.include_special_tokens = include;
        self
    }

    /// Parse strategy names from configuration settings.
    ///
    /// # Errors
    ///
    /// Unknown aggregation or post-processing names, or an invalid result.
    pub fn from_settings(settings: &EncoderSettings) -> EncoderResult<Self> {
        let postprocessing = settings
            .postprocessing
            .iter()
            .map(|name| PostProcessing::from_name(name))
            .collect::<EncoderResult<Vec<_>>>()?;
        let config = Self {
            model_id: settings.model_id.clone(),
            context_dimension: settings.context_dimension.clone(),
            bidirectional: settings.bidirectional,
            aggregation: AggregationPolicy::from_name(&settings.aggregation)?,
            postprocessing,
            include_special_tokens: settings.include_special_tokens,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> EncoderResult<()> {
        if self.model_id.trim().is_empty() {
            return Err(EncoderError::InvalidConfig("model_id must not be empty".to_string()));
        }
        if matches!(&self.context_dimension, Some(dim) if dim.trim().is_empty()) {
            return Err(EncoderError::InvalidConfig(
                "context_dimension must be a coordinate name or unset".to_string(),
            ));
        }
        Ok(())
    }

    pub fn postprocessing_names(&self) -> Vec<String> {
        self.postprocessing.iter().map(PostProcessing::identity).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_default_settings() {
        let config = EncoderConfig::from_settings(&EncoderSettings::default()).unwrap();
        assert_eq!(config, EncoderConfig::new("gpt2"));
    }

    #[test]
    fn test_unknown_aggregation_names_value() {
        let settings = EncoderSettings {
            aggregation: "maximum".to_string(),
            ..EncoderSettings::default()
        };
        let err = EncoderConfig::from_settings(&settings).unwrap_err();
        assert!(err.to_string().contains("maximum"));
    }

    #[test]
    fn test_unknown_postprocessing_names_value() {
        let settings = EncoderSettings {
            postprocessing: vec!["demean".to_string(), "whiten".to_string()],
            ..EncoderSettings::default()
        };
        let err = EncoderConfig::from_settings(&settings).unwrap_err();
        assert!(err.to_string().contains("whiten"));
    }

    #[test]
    fn test_empty_model_id_rejected() {
        assert!(EncoderConfig::new(" ").validate().is_err());
    }

    #[test]
    fn test_builder_records_postprocessing_order() {
        let config = EncoderConfig::new("bert")
            .with_postprocessing(PostProcessing::MinMax)
            .with_postprocessing(PostProcessing::Demean);
        assert_eq!(config.postprocessing_names(), vec!["minmax", "demean"]);
    }
}
