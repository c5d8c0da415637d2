//! Tag policy: which morphological tags carry content and how much they
//! weigh in the weighted average vector.
//!
//! Tags come from the normalizer and are treated as opaque strings. The
//! policy decides two things: whether a tag participates in the lexical
//! token set at all (`is_content`), and its salience weight when token
//! vectors are averaged (`weight`).

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Content/weight policy over normalizer tags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagPolicy {
    /// Tags excluded from scoring entirely (pure punctuation, symbols).
    pub non_content: BTreeSet<String>,
    /// Per-tag salience weights; tags absent here use `default_weight`.
    pub weights: BTreeMap<String, f32>,
    /// Weight applied to tags without an explicit entry.
    pub default_weight: f32,
}

impl Default for TagPolicy {
    fn default() -> Self {
        Self {
            non_content: ["punct", "symbol"].iter().map(|s| s.to_string()).collect(),
            weights: BTreeMap::new(),
            default_weight: 1.0,
        }
    }
}

impl TagPolicy {
    /// Whether tokens with this tag participate in scoring.
    pub fn is_content(&self, tag: &str) -> bool {
        !self.non_content.contains(tag)
    }

    /// Salience weight for a tag; 0.0 for non-content tags.
    pub fn weight(&self, tag: &str) -> f32 {
        if !self.is_content(tag) {
            return 0.0;
        }
        self.weights.get(tag).copied().unwrap_or(self.default_weight)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_excludes_punctuation() {
        let policy = TagPolicy::default();
        assert!(!policy.is_content("punct"));
        assert!(policy.is_content("word"));
        assert_eq!(policy.weight("punct"), 0.0);
        assert_eq!(policy.weight("word"), 1.0);
    }

    #[test]
    fn test_explicit_weights_override_default() {
        let mut policy = TagPolicy::default();
        policy.weights.insert("josa".into(), 0.2);
        assert_eq!(policy.weight("josa"), 0.2);
        assert_eq!(policy.weight("noun"), 1.0);
    }
}
