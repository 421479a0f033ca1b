//! Layer-wise representation encoder.
//!
//! [`LayerwiseEncoder::encode`] turns a [`Dataset`] into an
//! [`EncoderRepresentations`] bundle:
//!
//! 1. look the configuration up in the cache (if reading is enabled)
//! 2. partition stimuli into context groups, first-occurrence order
//! 3. encode every stimulus within its group, one model call per stimulus
//! 4. scatter the rows back into dataset order and check the layer layout
//! 5. run the post-processing steps layer-wise
//! 6. reattach sample metadata and persist (if writing is enabled)
//!
//! Any alignment or layout violation aborts the whole call.

use tracing::{debug, info, warn};

use langscore_core::config::CacheConfig;
use langscore_core::util::first_occurrence_order;
use langscore_core::{CoreError, Dataset};

use crate::cache::{CacheError, RepresentationCache};
use crate::config::EncoderConfig;
use crate::context::{context_groups, encode_stimuli_in_context, InContextOptions};
use crate::error::{EncoderError, EncoderResult};
use crate::model::HiddenStateModel;
use crate::representations::{ActivationArray, EncoderRepresentations, FeatureMatrix};
use crate::tokenizer::{special_token_offset, TextTokenizer};

/// Cache usage of one [`LayerwiseEncoder::encode`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeOptions {
    pub read_cache: bool,
    pub write_cache: bool,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            read_cache: true,
            write_cache: true,
        }
    }
}

impl From<&CacheConfig> for EncodeOptions {
    fn from(config: &CacheConfig) -> Self {
        Self {
            read_cache: config.read_cache,
            write_cache: config.write_cache,
        }
    }
}

/// Encoder over a tokenizer and a hidden-state model.
pub struct LayerwiseEncoder<T, M> {
    config: EncoderConfig,
    tokenizer: T,
    model: M,
    cache: Option<Box<dyn RepresentationCache>>,
}

impl<T, M> LayerwiseEncoder<T, M>
where
    T: TextTokenizer,
    M: HiddenStateModel,
{
    /// # Errors
    ///
    /// [`EncoderError::InvalidConfig`] if `config` does not validate.
    pub fn new(config: EncoderConfig, tokenizer: T, model: M) -> EncoderResult<Self> {
        config.validate()?;
        if config.model_id != model.model_id() {
            debug!(
                config_model = %config.model_id,
                model = %model.model_id(),
                "Model id differs from configured id; bundles use the configured id"
            );
        }
        Ok(Self {
            config,
            tokenizer,
            model,
            cache: None,
        })
    }

    #[must_use]
    pub fn with_cache(mut self, cache: impl RepresentationCache + 'static) -> Self {
        self.cache = Some(Box::new(cache));
        self
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Bundle carrying only the configuration.
    pub fn template(&self) -> EncoderRepresentations {
        EncoderRepresentations {
            model_id: self.config.model_id.clone(),
            context_dimension: self.config.context_dimension.clone(),
            bidirectional: self.config.bidirectional,
            aggregation: self.config.aggregation.identity(),
            postprocessing: self.config.postprocessing_names(),
            include_special_tokens: self.config.include_special_tokens,
            dataset_identifier: None,
            representations: None,
        }
    }

    /// Cache key of this encoder's output.
    pub fn identifier(&self) -> String {
        self.template().identifier()
    }

    /// Encode `dataset`, going through the cache as `options` allow.
    pub fn encode(&self, dataset: &Dataset, options: EncodeOptions) -> EncoderResult<EncoderRepresentations> {
        let mut bundle = self.template();
        let key = bundle.identifier();

        if options.read_cache {
            if let Some(cache) = &self.cache {
                match cache.load(&key) {
                    Ok(cached) => {
                        if cached.dataset_identifier.as_deref() != Some(dataset.identifier()) {
                            warn!(
                                key = %key,
                                cached = ?cached.dataset_identifier,
                                requested = %dataset.identifier(),
                                "Cached representations were computed on a different dataset"
                            );
                        }
                        info!(key = %key, "Loaded representations from cache");
                        return Ok(cached);
                    }
                    Err(CacheError::NotFound { .. }) => {
                        warn!(key = %key, "No cached representations, computing");
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        }

        info!(
            key = %key,
            dataset = %dataset.identifier(),
            stimuli = dataset.len(),
            "Encoding representations"
        );
        let array = self.compute(dataset)?;
        info!(key = %key, shape = ?array.shape(), layers = array.layers().len(), "Encoded representations");

        bundle.dataset_identifier = Some(dataset.identifier().to_string());
        bundle.representations = Some(array);

        if options.write_cache {
            if let Some(cache) = &self.cache {
                cache.store(&bundle, true)?;
                info!(key = %key, "Stored representations in cache");
            }
        }
        Ok(bundle)
    }

    fn compute(&self, dataset: &Dataset) -> EncoderResult<ActivationArray> {
        if dataset.is_empty() {
            return Err(CoreError::EmptyInput(format!("dataset '{}'", dataset.identifier())).into());
        }

        let special_token_offset = special_token_offset(&self.tokenizer)?;
        let groups = context_groups(dataset, self.config.context_dimension.as_deref())?;
        debug!(groups = groups.len(), special_token_offset, "Context groups built");

        let options = InContextOptions {
            bidirectional: self.config.bidirectional,
            include_special_tokens: self.config.include_special_tokens,
            special_token_offset,
            aggregation: &self.config.aggregation,
        };

        let mut rows: Vec<Option<Vec<f32>>> = vec![None; dataset.len()];
        let mut layout: Option<Vec<u32>> = None;
        for group in &groups {
            debug!(group = %group.label, size = group.indices.len(), "Encoding context group");
            let stimuli: Vec<String> = group
                .indices
                .iter()
                .map(|&i| dataset.stimuli()[i].clone())
                .collect();
            let encodings = encode_stimuli_in_context(&stimuli, &self.tokenizer, &self.model, options);
            for (&sample, encoding) in group.indices.iter().zip(encodings) {
                let (values, layer_ids) = encoding?.flatten()?;
                match &layout {
                    None => layout = Some(layer_ids),
                    Some(expected) if *expected != layer_ids => {
                        return Err(EncoderError::LayerLayout {
                            sample,
                            expected: describe_layout(expected),
                            actual: describe_layout(&layer_ids),
                        });
                    }
                    Some(_) => {}
                }
                rows[sample] = Some(values);
            }
        }

        let rows: Vec<Vec<f32>> = rows.into_iter().flatten().collect();
        if rows.len() != dataset.len() {
            return Err(EncoderError::ShapeMismatch {
                context: "encoded rows vs stimuli".to_string(),
                expected: vec![dataset.len()],
                actual: vec![rows.len()],
            });
        }
        let layer_ids = layout.unwrap_or_default();

        let mut features = FeatureMatrix::from_rows(&rows)?;
        let mut layer_ids = layer_ids;
        for step in &self.config.postprocessing {
            debug!(step = step.name(), "Post-processing");
            (features, layer_ids) = step.apply(features, layer_ids)?;
        }

        ActivationArray::new(features, layer_ids, dataset.sample_ids().to_vec())?.with_metadata(dataset)
    }
}

/// `layer:width` pairs in first-occurrence order, e.g. `0:768,1:768`.
fn describe_layout(layer_ids: &[u32]) -> String {
    first_occurrence_order(layer_ids)
        .into_iter()
        .map(|layer| {
            let width = layer_ids.iter().filter(|&&id| id == layer).count();
            format!("{layer}:{width}")
        })
        .collect::<Vec<_>>()
        .join(",")
}
