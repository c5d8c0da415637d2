//! Handler façade: accept a chat message, resolve it through the query
//! maker, persist the query record, and shape the response payload.
//!
//! Persist-then-respond ordering is fixed: the query is written to the
//! log before the response is returned, and a log-write failure surfaces
//! as an error carrying the already-computed payload so the transport
//! can report partial success.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use faq_engine_core::error::MatchError;
use faq_engine_core::matcher::QueryMaker;
use faq_engine_core::models::{Measurement, Query};
use faq_engine_core::store::{QueryLog, QuestionStore};

/// External response payload for one resolved chat message.
///
/// `distance` is whichever score is authoritative per `measurement`:
/// the manhattan distance for semantic matches, the jaccard score for
/// lexical ones.
#[derive(Debug, Clone, Serialize)]
pub struct Response {
    pub morphs: BTreeMap<String, String>,
    pub measurement: Measurement,
    pub with: Option<String>,
    pub distance: Option<f64>,
    pub answer: String,
    pub category: Option<String>,
}

impl Response {
    pub fn from_query(query: &Query) -> Self {
        let morphs = query
            .morphs
            .iter()
            .map(|m| (m.token.clone(), m.tag.clone()))
            .collect();
        let distance = match query.measurement {
            Measurement::Manhattan => query.manhattan_similarity,
            Measurement::Jaccard => query.jaccard_similarity,
        };
        Self {
            morphs,
            measurement: query.measurement,
            with: query.matched_question.clone(),
            distance,
            answer: query.answer.clone(),
            category: query.category.clone(),
        }
    }
}

/// Handler-boundary failures.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Match(#[from] MatchError),

    /// The match was computed but could not be persisted. The payload is
    /// carried so the caller can still report it alongside the failure.
    #[error("query log write failed: {reason}")]
    LogWrite { reason: String, response: Response },
}

/// Thin façade over the query maker and the two stores.
pub struct Handler {
    maker: QueryMaker,
    corpus: Arc<dyn QuestionStore>,
    log: Arc<dyn QueryLog>,
}

impl Handler {
    pub fn new(maker: QueryMaker, corpus: Arc<dyn QuestionStore>, log: Arc<dyn QueryLog>) -> Self {
        Self { maker, corpus, log }
    }

    pub fn maker(&self) -> &QueryMaker {
        &self.maker
    }

    /// Resolve one chat message: match, persist, respond.
    pub async fn handle(
        &self,
        chat: &str,
        added_time: Option<DateTime<Utc>>,
    ) -> Result<Response, HandlerError> {
        let query = self
            .maker
            .make_query(self.corpus.as_ref(), chat, added_time)
            .await?;
        let response = Response::from_query(&query);
        if let Err(e) = self.log.insert(&query).await {
            return Err(HandlerError::LogWrite {
                reason: e.to_string(),
                response,
            });
        }
        Ok(response)
    }
}
