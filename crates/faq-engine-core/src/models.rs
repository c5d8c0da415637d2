//! Core data models of the matching engine.
//!
//! These types represent the curated corpus entries, the morphological
//! tokens produced by the normalizer, and the resolved query records that
//! flow through the match pipeline into the query log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A morphological token/tag pair produced by the normalizer.
///
/// Tags are opaque strings owned by the normalizer (`"word"`, `"noun"`,
/// `"punct"`, ...); the engine only consults the [`TagPolicy`](crate::tags::TagPolicy)
/// to decide which tags are content-bearing and how much they weigh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Morph {
    pub token: String,
    pub tag: String,
}

impl Morph {
    pub fn new(token: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            tag: tag.into(),
        }
    }
}

/// Which scoring method determined a query's matched question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Measurement {
    /// Lexical token-set overlap.
    Jaccard,
    /// Semantic vector distance (lower = closer). Named after the default
    /// L1 metric; still reported as `manhattan` when the configured
    /// metric is euclidean.
    Manhattan,
}

impl Measurement {
    pub fn as_str(&self) -> &'static str {
        match self {
            Measurement::Jaccard => "jaccard",
            Measurement::Manhattan => "manhattan",
        }
    }
}

impl std::str::FromStr for Measurement {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "jaccard" => Ok(Measurement::Jaccard),
            "manhattan" => Ok(Measurement::Manhattan),
            other => Err(anyhow::anyhow!("unknown measurement: {}", other)),
        }
    }
}

/// A curated corpus entry: canonical question, answer, and metadata.
///
/// Created by the ingestion path, persisted once, read-only thereafter
/// during matching. The `feature_vector` is required — a question without
/// one is rejected at insertion, never stored with a null vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    /// Canonical question text. Unique in intent; duplicates are a
    /// data-quality issue caught at insertion by [`Question::dedup_hash`].
    pub text: String,
    /// Classification label (topic tag).
    pub category: Option<String>,
    /// Payload returned to the user when this question is matched.
    pub answer: String,
    /// Fixed-length weighted-average embedding vector, computed at
    /// insertion time.
    pub feature_vector: Vec<f32>,
    /// Up to three salient keywords, ordered by importance. Used for
    /// keyword-frequency analytics, not scoring.
    pub keyword_1: Option<String>,
    pub keyword_2: Option<String>,
    pub keyword_3: Option<String>,
    /// Storage-assigned identity; `None` until persisted.
    pub object_id: Option<String>,
}

impl Question {
    /// Keywords in importance order, skipping unset slots.
    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        self.keyword_1
            .iter()
            .chain(self.keyword_2.iter())
            .chain(self.keyword_3.iter())
            .map(String::as_str)
    }

    /// Hash of the trimmed canonical text, used for duplicate detection
    /// at insertion.
    pub fn dedup_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.text.trim().as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

/// One resolved match event, written once to the query log.
///
/// Exactly one of `jaccard_similarity` / `manhattan_similarity` is
/// authoritative, recorded in `measurement`; the other may be present for
/// audit but never drives the decision. Presence is modelled with
/// `Option` — a `Some(0.0)` manhattan distance is a valid (exact) semantic
/// score, not an absent one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Query {
    /// Raw input text as received.
    pub chat: String,
    /// Token/tag pairs extracted from the cleaned chat text, in order.
    pub morphs: Vec<Morph>,
    /// Text of the best-matched question; `None` when no acceptable
    /// match exists.
    pub matched_question: Option<String>,
    /// Category carried from the matched question.
    pub category: Option<String>,
    /// Answer payload from the matched question, or the configured
    /// fallback response.
    pub answer: String,
    /// Lexical similarity against the matched question (or the top
    /// lexical candidate when the match fell through).
    pub jaccard_similarity: Option<f64>,
    /// Semantic distance (lower = closer); absent when no vector could
    /// be computed.
    pub manhattan_similarity: Option<f64>,
    /// The scoring method that determined `matched_question`.
    pub measurement: Measurement,
    /// Resolution timestamp, caller-supplied or defaulted at processing
    /// time.
    pub added_time: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_measurement_roundtrip() {
        for m in [Measurement::Jaccard, Measurement::Manhattan] {
            let parsed: Measurement = m.as_str().parse().unwrap();
            assert_eq!(parsed, m);
        }
        assert!("cosine".parse::<Measurement>().is_err());
    }

    #[test]
    fn test_measurement_serde_lowercase() {
        let json = serde_json::to_string(&Measurement::Manhattan).unwrap();
        assert_eq!(json, "\"manhattan\"");
    }

    #[test]
    fn test_keywords_skip_unset() {
        let q = Question {
            text: "t".into(),
            category: None,
            answer: "a".into(),
            feature_vector: vec![0.0],
            keyword_1: Some("shuttle".into()),
            keyword_2: None,
            keyword_3: Some("schedule".into()),
            object_id: None,
        };
        let kws: Vec<&str> = q.keywords().collect();
        assert_eq!(kws, vec!["shuttle", "schedule"]);
    }

    #[test]
    fn test_dedup_hash_ignores_surrounding_whitespace() {
        let mut q = Question {
            text: "셔틀 언제 오나요?".into(),
            category: None,
            answer: "a".into(),
            feature_vector: vec![0.0],
            keyword_1: None,
            keyword_2: None,
            keyword_3: None,
            object_id: None,
        };
        let h1 = q.dedup_hash();
        q.text = "  셔틀 언제 오나요?  ".into();
        assert_eq!(h1, q.dedup_hash());
    }
}
