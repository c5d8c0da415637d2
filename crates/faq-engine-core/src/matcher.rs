//! The query maker: the single orchestration point that turns raw chat
//! text into a finalized [`Query`] record.
//!
//! # Match pipeline
//!
//! 1. Clean the chat text via the normalizer (degrades to the raw text).
//! 2. Extract morphs from the cleaned text.
//! 3. Embed the content tokens (failure degrades to lexical-only).
//! 4. Collapse token vectors into the weighted average query vector.
//! 5. Rank both metrics against the corpus snapshot.
//! 6. Select through the ordered decision chain: semantic stage →
//!    lexical stage → no-match fallback.
//! 7. Assemble the immutable query record.
//!
//! The decision chain prefers the richer semantic signal when it exists
//! and passes the acceptance threshold; it never treats a missing score
//! and a zero distance as the same thing.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::error::{InsertionRejection, MatchError};
use crate::models::{Measurement, Morph, Query, Question};
use crate::provider::{Embedder, Normalizer};
use crate::score::{self, LexicalCandidate, SemanticRanking};
use crate::store::QuestionStore;
use crate::tags::TagPolicy;
use crate::vector::{weighted_average_vector, DistanceMetric};

/// Tuning parameters for match selection.
#[derive(Debug, Clone)]
pub struct MatchParams {
    /// Semantic acceptance threshold: a top candidate farther than this
    /// is treated as "no good match" and the chain falls through.
    pub max_distance: f64,
    /// Distance metric for semantic ranking.
    pub metric: DistanceMetric,
    /// Candidates retained by diagnostic callers.
    pub top_k: usize,
    /// Answer returned when no stage accepts a candidate.
    pub fallback_answer: String,
}

impl Default for MatchParams {
    fn default() -> Self {
        Self {
            max_distance: 12.0,
            metric: DistanceMetric::Manhattan,
            top_k: 3,
            fallback_answer: "Sorry, I couldn't find an answer for that.".to_string(),
        }
    }
}

/// Outcome of the match decision chain, tagged per stage.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchDecision {
    /// Semantic stage accepted: top-ranked candidate within threshold.
    Semantic { index: usize, distance: f64 },
    /// Lexical stage accepted: top-ranked candidate with token overlap.
    Lexical { index: usize, score: f64 },
    /// Neither stage produced an acceptable candidate.
    NoMatch,
}

/// Run the decision chain over the two rankings.
///
/// The semantic stage accepts iff a ranking exists (a query vector was
/// computed and at least one candidate had a usable vector) and its top
/// distance is within `max_distance` — an exact 0.0 distance is a valid
/// acceptance, presence is not a truthiness check. The lexical stage
/// accepts iff the top Jaccard score shows any overlap.
pub fn select_match(
    lexical: &[LexicalCandidate],
    semantic: Option<&SemanticRanking>,
    max_distance: f64,
) -> MatchDecision {
    if let Some(ranking) = semantic {
        if let Some(top) = ranking.ranked.first() {
            if top.distance <= max_distance {
                return MatchDecision::Semantic {
                    index: top.index,
                    distance: top.distance,
                };
            }
        }
    }
    if let Some(top) = lexical.first() {
        if top.score > 0.0 {
            return MatchDecision::Lexical {
                index: top.index,
                score: top.score,
            };
        }
    }
    MatchDecision::NoMatch
}

/// Orchestrates normalization, embedding, scoring, and selection.
///
/// Constructed once at process start with its collaborators injected;
/// holds only shared read-only state, so concurrent calls need no
/// coordination.
pub struct QueryMaker {
    normalizer: Arc<dyn Normalizer>,
    embedder: Arc<dyn Embedder>,
    params: MatchParams,
    tags: TagPolicy,
}

impl QueryMaker {
    pub fn new(
        normalizer: Arc<dyn Normalizer>,
        embedder: Arc<dyn Embedder>,
        params: MatchParams,
        tags: TagPolicy,
    ) -> Self {
        Self {
            normalizer,
            embedder,
            params,
            tags,
        }
    }

    pub fn params(&self) -> &MatchParams {
        &self.params
    }

    pub fn tags(&self) -> &TagPolicy {
        &self.tags
    }

    /// Clean text, best-effort: a normalizer failure logs a warning and
    /// the raw text is treated as already clean.
    pub async fn clean(&self, text: &str) -> (String, Vec<String>) {
        match self.normalizer.clean(text).await {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, "normalizer clean failed, treating raw text as clean");
                (text.to_string(), Vec::new())
            }
        }
    }

    /// Extract morphs, best-effort: a normalizer failure logs a warning
    /// and falls back to whitespace tokens so lexical scoring still has
    /// input.
    pub async fn morphs(&self, text: &str) -> Vec<Morph> {
        match self.normalizer.morphs(text).await {
            Ok(morphs) => morphs,
            Err(e) => {
                warn!(error = %e, "normalizer morphs failed, using whitespace tokens");
                text.split_whitespace()
                    .map(|t| Morph::new(t, "word"))
                    .collect()
            }
        }
    }

    /// Embed the content tokens of a morph sequence and collapse them
    /// into the weighted average vector. `Ok(None)` means no content
    /// token carried weight; `Err` means the embedding path itself is
    /// unavailable.
    async fn embed_morphs(&self, morphs: &[Morph]) -> Result<Option<Vec<f32>>, MatchError> {
        let content: Vec<&Morph> = morphs
            .iter()
            .filter(|m| self.tags.weight(&m.tag) > 0.0)
            .collect();
        if content.is_empty() {
            return Ok(None);
        }
        let tokens: Vec<String> = content.iter().map(|m| m.token.clone()).collect();
        let vectors = self
            .embedder
            .embed_tokens(&tokens)
            .await
            .map_err(|e| MatchError::EmbeddingUnavailable(e.to_string()))?;
        if vectors.len() != tokens.len() {
            return Err(MatchError::EmbeddingUnavailable(format!(
                "expected {} vectors, got {}",
                tokens.len(),
                vectors.len()
            )));
        }
        let content: Vec<Morph> = content.into_iter().cloned().collect();
        Ok(weighted_average_vector(&content, &vectors, &self.tags))
    }

    async fn candidate_token_sets(&self, questions: &[Question]) -> Vec<BTreeSet<String>> {
        let mut sets = Vec::with_capacity(questions.len());
        for question in questions {
            let morphs = self.morphs(&question.text).await;
            sets.push(score::token_set(&morphs, &self.tags));
        }
        sets
    }

    /// Resolve chat text into a finalized query record.
    ///
    /// `added_time` defaults to the processing time. Only a corpus read
    /// failure is a hard error; collaborator failures degrade the
    /// measurement instead.
    pub async fn make_query(
        &self,
        corpus: &dyn QuestionStore,
        chat: &str,
        added_time: Option<DateTime<Utc>>,
    ) -> Result<Query, MatchError> {
        let questions = corpus
            .find_all()
            .await
            .map_err(MatchError::CorpusUnavailable)?;

        let (cleaned, _removed) = self.clean(chat).await;
        let morphs = self.morphs(&cleaned).await;
        let query_tokens = score::token_set(&morphs, &self.tags);

        let query_vec = match self.embed_morphs(&morphs).await {
            Ok(vector) => vector,
            Err(e) => {
                warn!(error = %e, "degrading to lexical-only scoring");
                None
            }
        };

        let candidate_tokens = self.candidate_token_sets(&questions).await;
        let lexical = score::rank_lexical(&query_tokens, &candidate_tokens);
        let semantic = query_vec
            .as_deref()
            .map(|v| score::rank_semantic(v, &questions, self.params.metric));
        if let Some(ranking) = &semantic {
            if ranking.skipped > 0 {
                warn!(
                    skipped = ranking.skipped,
                    "questions without usable vectors excluded from semantic ranking"
                );
            }
        }

        let decision = select_match(&lexical, semantic.as_ref(), self.params.max_distance);

        let (matched_question, category, answer, jaccard_similarity, manhattan_similarity, measurement) =
            match decision {
                MatchDecision::Semantic { index, distance } => {
                    let question = &questions[index];
                    let jac = lexical.iter().find(|c| c.index == index).map(|c| c.score);
                    (
                        Some(question.text.clone()),
                        question.category.clone(),
                        question.answer.clone(),
                        jac,
                        Some(distance),
                        Measurement::Manhattan,
                    )
                }
                MatchDecision::Lexical { index, score } => {
                    let question = &questions[index];
                    let man = semantic.as_ref().and_then(|r| {
                        r.ranked.iter().find(|c| c.index == index).map(|c| c.distance)
                    });
                    (
                        Some(question.text.clone()),
                        question.category.clone(),
                        question.answer.clone(),
                        Some(score),
                        man,
                        Measurement::Jaccard,
                    )
                }
                MatchDecision::NoMatch => {
                    let jac = lexical.first().map(|c| c.score);
                    let man = semantic
                        .as_ref()
                        .and_then(|r| r.ranked.first().map(|c| c.distance));
                    (
                        None,
                        None,
                        self.params.fallback_answer.clone(),
                        jac,
                        man,
                        Measurement::Jaccard,
                    )
                }
            };

        Ok(Query {
            chat: chat.to_string(),
            morphs,
            matched_question,
            category,
            answer,
            jaccard_similarity,
            manhattan_similarity,
            measurement,
            added_time: added_time.unwrap_or_else(Utc::now),
        })
    }

    /// Raw lexical ranking for diagnostic callers: question text → score,
    /// descending. Bypasses match selection entirely.
    pub async fn get_jaccard(
        &self,
        corpus: &dyn QuestionStore,
        text: &str,
    ) -> Result<Vec<(String, f64)>, MatchError> {
        let questions = corpus
            .find_all()
            .await
            .map_err(MatchError::CorpusUnavailable)?;
        let (cleaned, _removed) = self.clean(text).await;
        let morphs = self.morphs(&cleaned).await;
        let query_tokens = score::token_set(&morphs, &self.tags);
        let candidate_tokens = self.candidate_token_sets(&questions).await;
        Ok(score::rank_lexical(&query_tokens, &candidate_tokens)
            .into_iter()
            .map(|c| (questions[c.index].text.clone(), c.score))
            .collect())
    }

    /// Analysis mode: the full `(question, distance)` ranking sorted
    /// ascending instead of a collapsed best match. Hard-errors when the
    /// embedding path is unavailable — there is nothing to rank with.
    pub async fn rank_features(
        &self,
        corpus: &dyn QuestionStore,
        text: &str,
    ) -> Result<Vec<(Question, f64)>, MatchError> {
        let questions = corpus
            .find_all()
            .await
            .map_err(MatchError::CorpusUnavailable)?;
        let (cleaned, _removed) = self.clean(text).await;
        let morphs = self.morphs(&cleaned).await;
        let query_vec = self
            .embed_morphs(&morphs)
            .await?
            .ok_or_else(|| MatchError::EmbeddingUnavailable("no content tokens to embed".into()))?;
        let ranking = score::rank_semantic(&query_vec, &questions, self.params.metric);
        Ok(ranking
            .ranked
            .into_iter()
            .map(|c| (questions[c.index].clone(), c.distance))
            .collect())
    }

    /// Build a corpus entry: clean, morph, embed, and collapse into the
    /// stored feature vector. Embedding is a hard requirement here — a
    /// question that cannot be vectorized is rejected, never stored with
    /// a null vector.
    pub async fn make_question(
        &self,
        text: &str,
        answer: &str,
        category: Option<String>,
        keywords: &[String],
    ) -> Result<Question, MatchError> {
        let (cleaned, _removed) = self.clean(text).await;
        let morphs = self.morphs(&cleaned).await;
        let feature_vector = self
            .embed_morphs(&morphs)
            .await?
            .ok_or(MatchError::InsertionRejected(InsertionRejection::MissingVector))?;
        Ok(Question {
            text: text.trim().to_string(),
            category,
            answer: answer.to_string(),
            feature_vector,
            keyword_1: keywords.first().cloned(),
            keyword_2: keywords.get(1).cloned(),
            keyword_3: keywords.get(2).cloned(),
            object_id: None,
        })
    }
}
