//! Vector utilities: weighted averaging, distance metrics, and the BLOB
//! codec used by persistent stores.

use serde::{Deserialize, Serialize};

use crate::models::Morph;
use crate::tags::TagPolicy;

/// Pairwise distance metric for semantic scoring. Lower = more similar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// L1 distance (default).
    Manhattan,
    /// L2 distance.
    Euclidean,
}

impl Default for DistanceMetric {
    fn default() -> Self {
        DistanceMetric::Manhattan
    }
}

impl DistanceMetric {
    /// Distance between two vectors of equal length.
    pub fn distance(&self, a: &[f32], b: &[f32]) -> f64 {
        match self {
            DistanceMetric::Manhattan => manhattan_distance(a, b),
            DistanceMetric::Euclidean => euclidean_distance(a, b),
        }
    }
}

/// L1 distance: sum of absolute component differences.
pub fn manhattan_distance(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).abs() as f64)
        .sum()
}

/// L2 distance.
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = (x - y) as f64;
            d * d
        })
        .sum::<f64>()
        .sqrt()
}

/// Collapse per-token embedding vectors into one fixed-length vector
/// using tag-based salience weights.
///
/// `morphs` and `vectors` are parallel: one vector per token, same order.
/// Tokens whose tag weighs 0.0 and vectors whose dimensionality disagrees
/// with the first usable vector contribute nothing. Returns `None` when
/// no token carries positive weight — the caller must treat that as "no
/// vector", never substitute zeros.
pub fn weighted_average_vector(
    morphs: &[Morph],
    vectors: &[Vec<f32>],
    policy: &TagPolicy,
) -> Option<Vec<f32>> {
    let mut acc: Option<Vec<f32>> = None;
    let mut total_weight = 0.0f32;

    for (morph, vector) in morphs.iter().zip(vectors.iter()) {
        let weight = policy.weight(&morph.tag);
        if weight <= 0.0 || vector.is_empty() {
            continue;
        }
        let acc = acc.get_or_insert_with(|| vec![0.0; vector.len()]);
        if vector.len() != acc.len() {
            continue;
        }
        for (slot, component) in acc.iter_mut().zip(vector.iter()) {
            *slot += weight * component;
        }
        total_weight += weight;
    }

    let mut acc = acc?;
    if total_weight <= 0.0 {
        return None;
    }
    for slot in acc.iter_mut() {
        *slot /= total_weight;
    }
    Some(acc)
}

/// Encode a float vector as a BLOB (little-endian f32 bytes).
///
/// Each `f32` is stored as 4 bytes in little-endian order, producing a
/// BLOB of `vec.len() × 4` bytes.
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a BLOB back into a float vector.
///
/// Reverses [`vec_to_blob`]: reads 4-byte little-endian `f32` values.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn morph(token: &str, tag: &str) -> Morph {
        Morph::new(token, tag)
    }

    #[test]
    fn test_vec_blob_roundtrip() {
        let vec = vec![1.0f32, -2.5, 3.125, 0.0, -0.001];
        let blob = vec_to_blob(&vec);
        let restored = blob_to_vec(&blob);
        assert_eq!(vec, restored);
    }

    #[test]
    fn test_manhattan_distance() {
        let a = vec![1.0f32, 2.0, 3.0];
        let b = vec![2.0f32, 0.0, 3.0];
        assert!((manhattan_distance(&a, &b) - 3.0).abs() < 1e-9);
        assert_eq!(manhattan_distance(&a, &a), 0.0);
    }

    #[test]
    fn test_euclidean_distance() {
        let a = vec![0.0f32, 0.0];
        let b = vec![3.0f32, 4.0];
        assert!((euclidean_distance(&a, &b) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_weighted_average_uniform_weights() {
        let morphs = vec![morph("a", "word"), morph("b", "word")];
        let vectors = vec![vec![1.0f32, 0.0], vec![0.0f32, 1.0]];
        let avg = weighted_average_vector(&morphs, &vectors, &TagPolicy::default()).unwrap();
        assert_eq!(avg, vec![0.5, 0.5]);
    }

    #[test]
    fn test_weighted_average_salience() {
        let mut policy = TagPolicy::default();
        policy.weights.insert("josa".into(), 0.0);
        let morphs = vec![morph("셔틀", "word"), morph("은", "josa")];
        let vectors = vec![vec![1.0f32, 1.0], vec![9.0f32, 9.0]];
        // zero-weight token contributes nothing
        let avg = weighted_average_vector(&morphs, &vectors, &policy).unwrap();
        assert_eq!(avg, vec![1.0, 1.0]);
    }

    #[test]
    fn test_weighted_average_none_without_content() {
        let policy = TagPolicy::default();
        let morphs = vec![morph("?", "punct")];
        let vectors = vec![vec![1.0f32, 2.0]];
        assert!(weighted_average_vector(&morphs, &vectors, &policy).is_none());
        assert!(weighted_average_vector(&[], &[], &policy).is_none());
    }

    #[test]
    fn test_weighted_average_skips_mismatched_dims() {
        let morphs = vec![morph("a", "word"), morph("b", "word")];
        let vectors = vec![vec![2.0f32, 2.0], vec![1.0f32, 2.0, 3.0]];
        let avg = weighted_average_vector(&morphs, &vectors, &TagPolicy::default()).unwrap();
        assert_eq!(avg, vec![2.0, 2.0]);
    }
}
