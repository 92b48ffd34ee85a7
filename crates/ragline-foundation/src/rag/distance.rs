//! Distance functions for embedding vectors
//!
//! Every metric is expressed as a distance: smaller values mean closer.

use ragline_kernel::rag::{Candidate, DistanceMetric};
use std::cmp::Ordering;

/// Compute the distance between two embedding vectors using the given metric.
pub fn compute_distance(a: &[f32], b: &[f32], metric: DistanceMetric) -> f32 {
    match metric {
        DistanceMetric::L2 => euclidean_distance(a, b),
        DistanceMetric::Cosine => 1.0 - cosine_similarity(a, b),
        DistanceMetric::Dot => -dot_product(a, b),
    }
}

/// Cosine similarity; 0.0 if either vector has zero magnitude.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot = dot_product(a, b);
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f32>()
        .sqrt()
}

fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Order candidates closest first and keep at most `limit`.
///
/// The sort is stable, so equal distances keep the order the candidates were
/// scanned in. NaN distances sort last.
pub fn nearest(mut candidates: Vec<Candidate>, limit: usize) -> Vec<Candidate> {
    candidates.sort_by(|a, b| match (a.distance.is_nan(), b.distance.is_nan()) {
        (false, false) => a.distance.partial_cmp(&b.distance).unwrap_or(Ordering::Equal),
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (true, true) => Ordering::Equal,
    });
    candidates.truncate(limit);
    candidates
}
