use std::collections::BTreeSet;

use crate::models::FeatureVector;

/// Cosine of the angle between two sparse vectors
///
/// Runs over the union of both key sets, absent keys counting as zero.
/// Returns `None` when either vector has zero norm.
pub fn cosine_similarity(a: &FeatureVector, b: &FeatureVector) -> Option<f64> {
    let keys: BTreeSet<&str> = a.keys().chain(b.keys()).collect();

    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;
    for key in keys {
        let va = a.get(key);
        let vb = b.get(key);
        dot += va * vb;
        norm_a += va * va;
        norm_b += vb * vb;
    }

    let denominator = norm_a.sqrt() * norm_b.sqrt();
    if denominator == 0.0 {
        return None;
    }
    Some(dot / denominator)
}

/// `1 - cosine`, or `0` when the cosine is undefined
///
/// A zero-norm side is treated as maximally similar.
pub fn distance(a: &FeatureVector, b: &FeatureVector) -> f64 {
    match cosine_similarity(a, b) {
        Some(cosine) => (1.0 - cosine).max(0.0),
        None => 0.0,
    }
}

/// `1 - distance`, clamped to `[0, 1]`
pub fn similarity(a: &FeatureVector, b: &FeatureVector) -> f64 {
    (1.0 - distance(a, b)).clamp(0.0, 1.0)
}
