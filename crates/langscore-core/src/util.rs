//! Shared numeric and ordering helpers.

use std::collections::HashSet;
use std::hash::Hash;

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if vectors have different lengths or either has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f64 = a.iter().zip(b.iter()).map(|(x, y)| *x as f64 * *y as f64).sum();
    let norm_a: f64 = a.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();

    if norm_a < f64::EPSILON || norm_b < f64::EPSILON {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// Median of `values`; the mean of the two middle values for even counts.
///
/// NaN entries are ignored. Returns NaN when nothing is left.
pub fn median(values: &[f64]) -> f64 {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if sorted.is_empty() {
        return f64::NAN;
    }
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Distinct values in order of first occurrence (stable, not sorted).
pub fn first_occurrence_order<T: Eq + Hash + Clone>(values: &[T]) -> Vec<T> {
    let mut seen = HashSet::with_capacity(values.len());
    values
        .iter()
        .filter(|v| seen.insert((*v).clone()))
        .cloned()
        .collect()
}
