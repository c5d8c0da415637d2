//! In-memory store implementation for tests and embedded use.
//!
//! `Vec`s behind `std::sync::RwLock`; insertion order is the vector
//! order, which is exactly the ranking tie-break order the scorer
//! expects.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use crate::error::{InsertionRejection, MatchError};
use crate::models::{Query, Question};

use super::{check_insertable, QueryLog, QuestionStore};

/// In-memory corpus + query log.
#[derive(Default)]
pub struct MemoryStore {
    questions: RwLock<Vec<Question>>,
    queries: RwLock<Vec<Query>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QuestionStore for MemoryStore {
    async fn find_all(&self) -> Result<Vec<Question>> {
        Ok(self.questions.read().unwrap().clone())
    }

    async fn find_by_category(&self, category: &str) -> Result<Vec<Question>> {
        Ok(self
            .questions
            .read()
            .unwrap()
            .iter()
            .filter(|q| q.category.as_deref() == Some(category))
            .cloned()
            .collect())
    }

    async fn find_by_text(&self, text: &str) -> Result<Option<Question>> {
        Ok(self
            .questions
            .read()
            .unwrap()
            .iter()
            .find(|q| q.text == text)
            .cloned())
    }

    async fn insert(&self, question: &Question) -> Result<String> {
        check_insertable(question)?;
        let mut questions = self.questions.write().unwrap();
        let hash = question.dedup_hash();
        if questions.iter().any(|q| q.dedup_hash() == hash) {
            return Err(MatchError::InsertionRejected(InsertionRejection::Duplicate).into());
        }
        let id = Uuid::new_v4().to_string();
        let mut stored = question.clone();
        stored.object_id = Some(id.clone());
        questions.push(stored);
        Ok(id)
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.questions.read().unwrap().len() as u64)
    }

    async fn keyword_counts(&self, n: usize) -> Result<Vec<(String, u64)>> {
        let mut counts: HashMap<String, u64> = HashMap::new();
        for question in self.questions.read().unwrap().iter() {
            for keyword in question.keywords() {
                *counts.entry(keyword.to_string()).or_insert(0) += 1;
            }
        }
        let mut counts: Vec<(String, u64)> = counts.into_iter().collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        counts.truncate(n);
        Ok(counts)
    }
}

#[async_trait]
impl QueryLog for MemoryStore {
    async fn insert(&self, query: &Query) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        self.queries.write().unwrap().push(query.clone());
        Ok(id)
    }

    async fn find_recent(&self, n: usize) -> Result<Vec<Query>> {
        let queries = self.queries.read().unwrap();
        Ok(queries.iter().rev().take(n).cloned().collect())
    }
}
