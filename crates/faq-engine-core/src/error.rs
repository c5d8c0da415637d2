//! Failure taxonomy of the matching engine.
//!
//! Transient collaborator failures (normalizer, embedder) are recovered
//! inside the match pipeline and only show up here when a caller needs
//! the richer signal as a hard requirement (question ingestion, analysis
//! mode). Structural failures (corpus unreachable, rejected insertions)
//! always propagate.

use thiserror::Error;

/// Why a question was refused at insertion time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertionRejection {
    /// The question carries no feature vector. A question without one
    /// cannot participate in semantic scoring and is never stored.
    MissingVector,
    /// A question with the same canonical text already exists.
    Duplicate,
}

impl std::fmt::Display for InsertionRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InsertionRejection::MissingVector => write!(f, "feature vector is required"),
            InsertionRejection::Duplicate => write!(f, "duplicate question text"),
        }
    }
}

/// Errors surfaced by the matching engine.
#[derive(Debug, Error)]
pub enum MatchError {
    /// The normalizer was unreachable or returned an error. Recovered
    /// locally during matching (the raw text is treated as already
    /// clean); surfaced only where normalization is a hard requirement.
    #[error("normalization failed: {0}")]
    Normalization(String),

    /// The embedding path failed or timed out. During matching this
    /// degrades the measurement to lexical-only; it is a hard error for
    /// ingestion and analysis mode, which cannot proceed without vectors.
    #[error("embedding unavailable: {0}")]
    EmbeddingUnavailable(String),

    /// The question corpus could not be read. Matching cannot proceed
    /// without candidates, so this is always a hard failure.
    #[error("question corpus unavailable: {0}")]
    CorpusUnavailable(anyhow::Error),

    /// A question was refused at insertion.
    #[error("question rejected: {0}")]
    InsertionRejected(InsertionRejection),
}
