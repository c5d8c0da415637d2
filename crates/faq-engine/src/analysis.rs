//! Diagnostics over the matching engine: lexical ranking breakdowns,
//! feature-similarity inspection, and keyword-frequency analytics.
//!
//! These bypass match selection — analytics callers want the raw
//! rankings, not a collapsed best match.

use std::collections::BTreeMap;

use anyhow::Result;
use serde::Serialize;

use faq_engine_core::matcher::QueryMaker;
use faq_engine_core::store::QuestionStore;

/// Morph-level diff between the query and one ranked candidate.
#[derive(Debug, Serialize)]
pub struct CandidateBreakdown {
    pub text: String,
    pub score: f64,
    pub only_in_query: BTreeMap<String, String>,
    pub only_in_question: BTreeMap<String, String>,
    pub in_both: BTreeMap<String, String>,
}

/// The lexical diagnostic payload: cleaned query, removed tokens, and a
/// token-overlap breakdown for each of the top candidates.
#[derive(Debug, Serialize)]
pub struct JaccardBreakdown {
    pub query: String,
    pub removed: Vec<String>,
    pub candidates: Vec<CandidateBreakdown>,
}

/// Explain the top-n lexical candidates for a query text.
pub async fn jaccard_breakdown(
    maker: &QueryMaker,
    corpus: &dyn QuestionStore,
    text: &str,
    n: usize,
) -> Result<JaccardBreakdown> {
    let (cleaned, removed) = maker.clean(text).await;
    let ranked = maker.get_jaccard(corpus, &cleaned).await?;
    let query_morphs = maker.morphs(&cleaned).await;

    let mut candidates = Vec::new();
    for (question_text, score) in ranked.into_iter().take(n) {
        let question_morphs = maker.morphs(&question_text).await;
        let question_tags: BTreeMap<String, String> = question_morphs
            .iter()
            .map(|m| (m.token.clone(), m.tag.clone()))
            .collect();

        let mut only_in_query = BTreeMap::new();
        let mut only_in_question = BTreeMap::new();
        let mut in_both = BTreeMap::new();

        for morph in &query_morphs {
            if question_tags.contains_key(&morph.token) {
                in_both.insert(morph.token.clone(), morph.tag.clone());
            } else {
                only_in_query.insert(morph.token.clone(), morph.tag.clone());
            }
        }
        for (token, tag) in &question_tags {
            if !in_both.contains_key(token) {
                only_in_question.insert(token.clone(), tag.clone());
            }
        }

        candidates.push(CandidateBreakdown {
            text: question_text,
            score,
            only_in_query,
            only_in_question,
            in_both,
        });
    }

    Ok(JaccardBreakdown {
        query: cleaned,
        removed,
        candidates,
    })
}

/// One entry of the feature-similarity ranking.
#[derive(Debug, Serialize)]
pub struct FeatureDistance {
    pub text: String,
    pub distance: f64,
}

/// Top-n questions by semantic distance to the query text, ascending.
/// Errors when the embedding path is unavailable.
pub async fn feature_similarity(
    maker: &QueryMaker,
    corpus: &dyn QuestionStore,
    text: &str,
    n: usize,
) -> Result<Vec<FeatureDistance>> {
    let ranked = maker.rank_features(corpus, text).await?;
    Ok(ranked
        .into_iter()
        .take(n)
        .map(|(question, distance)| FeatureDistance {
            text: question.text,
            distance,
        })
        .collect())
}

/// Most frequent keywords across the corpus.
pub async fn keyword_counts(
    store: &dyn QuestionStore,
    n: usize,
) -> Result<Vec<(String, u64)>> {
    store.keyword_counts(n).await
}
