//! Storage abstraction for the matching engine.
//!
//! Two append-flavored stores back the engine: the curated question
//! corpus (read by the scorer, written only by ingestion) and the query
//! log (append-only audit trail of resolved queries). Implementations
//! must be `Send + Sync`; the engine assumes each insert is atomic per
//! record and takes no locks of its own.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::error::{InsertionRejection, MatchError};
use crate::models::{Query, Question};

/// Admission check shared by all corpus backends: a question without a
/// feature vector is rejected outright, never stored with a null vector.
pub fn check_insertable(question: &Question) -> Result<()> {
    if question.feature_vector.is_empty() {
        return Err(MatchError::InsertionRejected(InsertionRejection::MissingVector).into());
    }
    Ok(())
}

/// The curated question corpus.
///
/// Matching is a pure reader: `find_all` materializes a consistent
/// snapshot in insertion order, and no matching call mutates entries.
#[async_trait]
pub trait QuestionStore: Send + Sync {
    /// All questions, in insertion order (ranking tie-break order).
    async fn find_all(&self) -> Result<Vec<Question>>;

    /// Questions with the given category, in insertion order.
    async fn find_by_category(&self, category: &str) -> Result<Vec<Question>>;

    /// Look up a question by its canonical text.
    async fn find_by_text(&self, text: &str) -> Result<Option<Question>>;

    /// Insert a question, returning its storage-assigned id.
    ///
    /// Rejects questions without a feature vector and duplicates of an
    /// existing canonical text (typed as
    /// [`MatchError::InsertionRejected`], downcastable from the error
    /// chain).
    async fn insert(&self, question: &Question) -> Result<String>;

    /// Number of stored questions.
    async fn count(&self) -> Result<u64>;

    /// Most frequent keywords across the corpus, descending by count;
    /// equal counts order by keyword.
    async fn keyword_counts(&self, n: usize) -> Result<Vec<(String, u64)>>;
}

/// Append-only log of resolved queries.
#[async_trait]
pub trait QueryLog: Send + Sync {
    /// Append one resolved query, returning its storage-assigned id.
    /// Must be atomic per record; the engine never updates a query in
    /// place.
    async fn insert(&self, query: &Query) -> Result<String>;

    /// Most recent queries, newest first. Audit/analytics read; no
    /// update or delete contract exists.
    async fn find_recent(&self, n: usize) -> Result<Vec<Query>>;
}
