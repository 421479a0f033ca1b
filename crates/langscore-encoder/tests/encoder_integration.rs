//! End-to-end tests of the layer-wise encoder with a fake tokenizer and model.
//!
//! The tokenizer maps each whitespace word to `10 + word length`, wrapped in
//! `1 ... 2` when special tokens are requested. The model's layer `l` at
//! position `p` holds `(l + 1) * s + c` in column `c`, where `s` is the running
//! sum of token ids (causal) or the sequence total (bidirectional).

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use candle_core::{Device, Tensor};

use langscore_core::Dataset;
use langscore_encoder::{
    ActivationArray, AggregateFn, AggregationPolicy, ConsistencyChecker, DiskCache, EncodeOptions, EncoderConfig,
    EncoderError, EncoderResult, FeatureMatrix, HiddenStateModel, LayerwiseEncoder, MemoryCache,
    PostProcessing, RepresentationCache, TextTokenizer,
};

const HIDDEN: usize = 4;
const LAYERS: usize = 3;

struct WordTokenizer;

impl TextTokenizer for WordTokenizer {
    fn encode(&self, text: &str, add_special_tokens: bool) -> EncoderResult<Vec<u32>> {
        let mut ids: Vec<u32> = text.split_whitespace().map(|w| 10 + w.len() as u32).collect();
        if add_special_tokens {
            ids.insert(0, 1);
            ids.push(2);
        }
        Ok(ids)
    }
}

#[derive(Default)]
struct FakeModel {
    calls: AtomicUsize,
    seen: Mutex<Vec<Vec<u32>>>,
    /// Drop a layer for sequences longer than three tokens.
    ragged: bool,
}

impl FakeModel {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl HiddenStateModel for FakeModel {
    fn model_id(&self) -> &str {
        "fake-lm"
    }

    fn hidden_states(&self, token_ids: &[u32], bidirectional: bool) -> EncoderResult<Vec<Tensor>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(token_ids.to_vec());

        let total: f32 = token_ids.iter().map(|&id| id as f32).sum();
        let mut running = 0.0;
        let positions: Vec<f32> = token_ids
            .iter()
            .map(|&id| {
                running += id as f32;
                if bidirectional {
                    total
                } else {
                    running
                }
            })
            .collect();

        let layers = if self.ragged && token_ids.len() > 3 { LAYERS - 1 } else { LAYERS };
        (0..layers)
            .map(|l| -> EncoderResult<Tensor> {
                let values: Vec<f32> = positions
                    .iter()
                    .flat_map(|&s| (0..HIDDEN).map(move |c| (l as f32 + 1.0) * s + c as f32))
                    .collect();
                Ok(Tensor::from_vec(values, (token_ids.len(), HIDDEN), &Device::Cpu)?)
            })
            .collect()
    }
}

fn encoder(config: EncoderConfig) -> LayerwiseEncoder<WordTokenizer, FakeModel> {
    LayerwiseEncoder::new(config, WordTokenizer, FakeModel::default()).unwrap()
}

fn no_cache() -> EncodeOptions {
    EncodeOptions {
        read_cache: false,
        write_cache: false,
    }
}

fn passages() -> Dataset {
    Dataset::from_stimuli(
        "passages",
        vec!["a".into(), "bb".into(), "ccc".into(), "dddd".into()],
    )
    .with_coord("passage", vec!["B".into(), "A".into(), "B".into(), "A".into()])
    .unwrap()
}

fn column(array: &ActivationArray, col: usize) -> Vec<f32> {
    let features = array.features();
    (0..features.rows()).map(|r| features.get(r, col)).collect()
}

#[test]
fn test_output_shape_and_layer_ids() {
    let enc = encoder(EncoderConfig::new("fake-lm"));
    let bundle = enc.encode(&passages(), no_cache()).unwrap();
    let array = bundle.representations.as_ref().unwrap();

    assert_eq!(array.shape(), (4, LAYERS * HIDDEN));
    assert_eq!(array.layer_ids().len(), array.features().cols());
    assert_eq!(array.layers(), vec![0, 1, 2]);
    assert_eq!(array.sample_ids(), ["0", "1", "2", "3"]);
    assert_eq!(array.stimuli(), ["a", "bb", "ccc", "dddd"]);
    assert_eq!(bundle.dataset_identifier.as_deref(), Some("passages"));
    assert_eq!(enc.model().calls(), 4);
}

#[test]
fn test_context_groups_processed_in_first_occurrence_order() {
    let enc = encoder(EncoderConfig::new("fake-lm").with_context_dimension("passage"));
    let bundle = enc.encode(&passages(), no_cache()).unwrap();

    let seen = enc.model().seen.lock().unwrap().clone();
    assert_eq!(
        seen,
        vec![
            vec![1, 11, 2],
            vec![1, 11, 13, 2],
            vec![1, 12, 2],
            vec![1, 12, 14, 2],
        ]
    );

    // Last token of each span is the trailing marker: the running sums are
    // 14, 27 for passage B and 15, 29 for passage A.
    let array = bundle.representations.unwrap();
    assert_eq!(column(&array, 0), vec![14.0, 15.0, 27.0, 29.0]);
    assert_eq!(array.coord("passage").unwrap(), ["B", "A", "B", "A"]);
}

#[test]
fn test_bidirectional_window_covers_whole_group() {
    let config = EncoderConfig::new("fake-lm")
        .with_context_dimension("passage")
        .with_bidirectional(true)
        .with_aggregation(AggregationPolicy::Mean);
    let enc = encoder(config);
    let array = enc.encode(&passages(), no_cache()).unwrap().representations.unwrap();

    assert_eq!(column(&array, 0), vec![27.0, 29.0, 27.0, 29.0]);
    assert_eq!(enc.model().calls(), 4);
}

#[test]
fn test_multi_token_stimulus_after_leading_marker() {
    let dataset = Dataset::from_stimuli("multi", vec!["a b".into(), "ccc".into()])
        .with_coord("story", vec!["s".into(), "s".into()])
        .unwrap();
    let config = EncoderConfig::new("fake-lm")
        .with_context_dimension("story")
        .with_aggregation(AggregationPolicy::Sum)
        .with_special_tokens(false);
    let array = encoder(config).encode(&dataset, no_cache()).unwrap().representations.unwrap();

    // "a b" spans positions 1..3 of [1, 11, 11, 2] (sums 12 + 23);
    // "ccc" spans position 3 of [1, 11, 11, 13, 2] (sum 36).
    assert_eq!(column(&array, 0), vec![35.0, 36.0]);
}

#[test]
fn test_disk_cache_round_trip_skips_model() {
    let dir = tempfile::tempdir().unwrap();
    let enc = encoder(EncoderConfig::new("fake-lm")).with_cache(DiskCache::new(dir.path()));

    let fresh = enc.encode(&passages(), EncodeOptions::default()).unwrap();
    assert_eq!(enc.model().calls(), 4);

    let cached = enc.encode(&passages(), EncodeOptions::default()).unwrap();
    assert_eq!(enc.model().calls(), 4);
    assert_eq!(cached, fresh);

    let reloaded = DiskCache::new(dir.path()).load(&enc.identifier()).unwrap();
    assert_eq!(reloaded, fresh);
}

#[test]
fn test_read_disabled_recomputes() {
    let enc = encoder(EncoderConfig::new("fake-lm")).with_cache(MemoryCache::new());
    enc.encode(&passages(), EncodeOptions::default()).unwrap();

    let options = EncodeOptions {
        read_cache: false,
        write_cache: true,
    };
    enc.encode(&passages(), options).unwrap();
    assert_eq!(enc.model().calls(), 8);
}

#[test]
fn test_configuration_changes_cache_key() {
    let plain = encoder(EncoderConfig::new("fake-lm"));
    let demeaned = encoder(EncoderConfig::new("fake-lm").with_postprocessing(PostProcessing::Demean));
    assert_ne!(plain.identifier(), demeaned.identifier());
    assert_eq!(plain.template().representations, None);
}

#[test]
fn test_custom_aggregation_never_reuses_builtin_cache_entry() {
    let dir = tempfile::tempdir().unwrap();
    let max: AggregateFn = Arc::new(|t: &Tensor| t.max(0));
    let custom_config =
        || EncoderConfig::new("fake-lm").with_aggregation(AggregationPolicy::custom("mean", max.clone()));

    let builtin = encoder(EncoderConfig::new("fake-lm").with_aggregation(AggregationPolicy::Mean))
        .with_cache(DiskCache::new(dir.path()));
    let custom = encoder(custom_config()).with_cache(DiskCache::new(dir.path()));
    assert_ne!(builtin.identifier(), custom.identifier());
    assert_ne!(builtin.config().aggregation, custom.config().aggregation);

    let mean = builtin.encode(&passages(), EncodeOptions::default()).unwrap();
    let via_cache = custom.encode(&passages(), EncodeOptions::default()).unwrap();
    let fresh = encoder(custom_config()).encode(&passages(), no_cache()).unwrap();

    assert_eq!(custom.model().calls(), 4);
    assert_eq!(via_cache.representations, fresh.representations);
    assert_ne!(via_cache.representations, mean.representations);
}

#[test]
fn test_empty_stimulus_at_window_edge_is_rejected() {
    for stimuli in [vec!["".to_string(), "abc".to_string()], vec!["abc".to_string(), "".to_string()]] {
        let dataset = Dataset::from_stimuli("gaps", stimuli.clone())
            .with_coord("story", vec!["s".into(), "s".into()])
            .unwrap();
        let enc = encoder(EncoderConfig::new("fake-lm").with_context_dimension("story"));
        let err = enc.encode(&dataset, no_cache()).unwrap_err();
        assert!(
            matches!(err, EncoderError::TokenAlignment { .. }),
            "{stimuli:?} gave {err}"
        );
    }
}

#[test]
fn test_demean_centres_every_column() {
    let enc = encoder(EncoderConfig::new("fake-lm").with_postprocessing(PostProcessing::Demean));
    let array = enc.encode(&passages(), no_cache()).unwrap().representations.unwrap();

    for col in 0..array.features().cols() {
        let mean: f32 = column(&array, col).iter().sum::<f32>() / 4.0;
        assert!(mean.abs() < 1e-4, "column {col} mean {mean}");
    }
    assert_eq!(array.layers(), vec![0, 1, 2]);
}

#[test]
fn test_inconsistent_layer_layout_aborts() {
    let dataset = Dataset::from_stimuli("ragged", vec!["a".into(), "b c".into()]);
    let model = FakeModel {
        ragged: true,
        ..FakeModel::default()
    };
    let enc = LayerwiseEncoder::new(EncoderConfig::new("fake-lm"), WordTokenizer, model).unwrap();

    let err = enc.encode(&dataset, no_cache()).unwrap_err();
    assert!(matches!(err, EncoderError::LayerLayout { sample: 1, .. }));
}

#[test]
fn test_unknown_context_dimension_is_error() {
    let enc = encoder(EncoderConfig::new("fake-lm").with_context_dimension("chapter"));
    assert!(enc.encode(&passages(), no_cache()).is_err());
    assert_eq!(enc.model().calls(), 0);
}

#[test]
fn test_consistency_of_repeated_encoding() {
    let enc = encoder(EncoderConfig::new("fake-lm"));
    let first = enc.encode(&passages(), no_cache()).unwrap().representations.unwrap();
    let second = enc.encode(&passages(), no_cache()).unwrap().representations.unwrap();

    let checker = ConsistencyChecker::default();
    let report = checker.check(&first, &second).unwrap();
    assert!(report.all_good);
    assert!(report.bad_stimuli.is_empty());

    // Perturb stimulus "2" in layer 1 by twice the threshold.
    let mut values = second.features().values().to_vec();
    let cols = second.features().cols();
    let target = 2 * cols + second.layer_columns(1)[0];
    values[target] += (2.0 * checker.threshold()) as f32;
    let perturbed = ActivationArray::new(
        FeatureMatrix::new(second.features().rows(), cols, values).unwrap(),
        second.layer_ids().to_vec(),
        second.sample_ids().to_vec(),
    )
    .unwrap();

    let report = checker.check(&first, &perturbed).unwrap();
    assert!(!report.all_good);
    assert_eq!(report.bad_stimuli.into_iter().collect::<Vec<_>>(), vec!["2".to_string()]);
    assert!(report.layers[0].acceptable);
    assert!(!report.layers[1].acceptable);
    assert!(report.layers[2].acceptable);
}
