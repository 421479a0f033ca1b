//! Descriptive statistics over activation arrays.

use serde::Serialize;

use crate::representations::ActivationArray;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerSparsity {
    pub layer: u32,
    /// Fraction of entries with magnitude at least the zero threshold.
    pub sparsity: f64,
}

/// `1 - (#|v| < zero_threshold) / size` per layer, in first-occurrence order.
pub fn layer_sparsity(array: &ActivationArray, zero_threshold: f32) -> Vec<LayerSparsity> {
    array
        .layers()
        .into_iter()
        .map(|layer| {
            let block = array.layer(layer);
            let size = block.values().len();
            let near_zero = block.values().iter().filter(|v| v.abs() < zero_threshold).count();
            let sparsity = if size == 0 {
                0.0
            } else {
                1.0 - near_zero as f64 / size as f64
            };
            LayerSparsity { layer, sparsity }
        })
        .collect()
}
