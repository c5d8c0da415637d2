//! Similarity scorer: lexical (Jaccard) and semantic (vector distance)
//! ranking of a query representation against the question corpus.
//!
//! Both rankings are deterministic: sorting is stable, so equal scores
//! keep corpus insertion order.

use std::collections::BTreeSet;

use crate::models::{Morph, Question};
use crate::tags::TagPolicy;
use crate::vector::DistanceMetric;

/// One corpus entry scored by lexical overlap. `index` points into the
/// corpus slice the ranking was computed over.
#[derive(Debug, Clone, PartialEq)]
pub struct LexicalCandidate {
    pub index: usize,
    pub score: f64,
}

/// One corpus entry scored by vector distance (lower = closer).
#[derive(Debug, Clone, PartialEq)]
pub struct SemanticCandidate {
    pub index: usize,
    pub distance: f64,
}

/// Semantic ranking plus partial-coverage accounting: candidates lacking
/// a usable feature vector are skipped and counted, never scored.
#[derive(Debug, Clone, Default)]
pub struct SemanticRanking {
    /// Candidates sorted ascending by distance.
    pub ranked: Vec<SemanticCandidate>,
    /// Number of corpus entries excluded for missing/mismatched vectors.
    pub skipped: usize,
}

/// Content token set of a morph sequence under the given tag policy.
pub fn token_set(morphs: &[Morph], policy: &TagPolicy) -> BTreeSet<String> {
    morphs
        .iter()
        .filter(|m| policy.is_content(&m.tag))
        .map(|m| m.token.clone())
        .collect()
}

/// Jaccard similarity: |intersection| / |union|.
///
/// An empty union (both sets empty) scores 0.0, not NaN. Symmetric and
/// bounded in [0, 1].
pub fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    intersection as f64 / union as f64
}

/// Rank candidate token sets by Jaccard similarity to the query tokens,
/// descending. Ties keep candidate order (stable sort).
pub fn rank_lexical(
    query_tokens: &BTreeSet<String>,
    candidate_tokens: &[BTreeSet<String>],
) -> Vec<LexicalCandidate> {
    let mut ranked: Vec<LexicalCandidate> = candidate_tokens
        .iter()
        .enumerate()
        .map(|(index, tokens)| LexicalCandidate {
            index,
            score: jaccard(query_tokens, tokens),
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ranked
}

/// Rank corpus entries by distance from the query vector, ascending.
///
/// Entries whose feature vector is empty or disagrees with the query
/// vector's dimensionality are excluded from the ranking and counted in
/// [`SemanticRanking::skipped`] so callers can detect partial coverage.
pub fn rank_semantic(
    query_vec: &[f32],
    corpus: &[Question],
    metric: DistanceMetric,
) -> SemanticRanking {
    let mut ranking = SemanticRanking::default();
    for (index, question) in corpus.iter().enumerate() {
        if question.feature_vector.is_empty() || question.feature_vector.len() != query_vec.len() {
            ranking.skipped += 1;
            continue;
        }
        ranking.ranked.push(SemanticCandidate {
            index,
            distance: metric.distance(query_vec, &question.feature_vector),
        });
    }
    ranking.ranked.sort_by(|a, b| {
        a.distance
            .partial_cmp(&b.distance)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ranking
}
