//! SQLite-backed implementations of the [`QuestionStore`] and
//! [`QueryLog`] traits.
//!
//! Each trait method maps to one or two SQL statements. `find_all`
//! orders by rowid, which is insertion order — the ranking tie-break
//! order the scorer expects. Query-log inserts are single-statement and
//! therefore atomic per record.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use faq_engine_core::error::{InsertionRejection, MatchError};
use faq_engine_core::models::{Measurement, Morph, Query, Question};
use faq_engine_core::store::{check_insertable, QueryLog, QuestionStore};
use faq_engine_core::vector::{blob_to_vec, vec_to_blob};

/// SQLite store backing both the question corpus and the query log.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn row_to_question(row: &SqliteRow) -> Question {
    let blob: Vec<u8> = row.get("feature_vector");
    Question {
        text: row.get("text"),
        category: row.get("category"),
        answer: row.get("answer"),
        feature_vector: blob_to_vec(&blob),
        keyword_1: row.get("keyword_1"),
        keyword_2: row.get("keyword_2"),
        keyword_3: row.get("keyword_3"),
        object_id: Some(row.get("id")),
    }
}

fn row_to_query(row: &SqliteRow) -> Result<Query> {
    let morphs_json: String = row.get("morphs_json");
    let morphs: Vec<Morph> =
        serde_json::from_str(&morphs_json).context("invalid morphs_json in query log")?;
    let measurement: String = row.get("measurement");
    let measurement: Measurement = measurement.parse()?;
    let added_time: i64 = row.get("added_time");
    Ok(Query {
        chat: row.get("chat"),
        morphs,
        matched_question: row.get("matched_question"),
        category: row.get("category"),
        answer: row.get("answer"),
        jaccard_similarity: row.get("jaccard_similarity"),
        manhattan_similarity: row.get("manhattan_similarity"),
        measurement,
        added_time: chrono::DateTime::from_timestamp(added_time, 0).unwrap_or_default(),
    })
}

#[async_trait]
impl QuestionStore for SqliteStore {
    async fn find_all(&self) -> Result<Vec<Question>> {
        let rows = sqlx::query(
            "SELECT id, text, category, answer, feature_vector, keyword_1, keyword_2, keyword_3 \
             FROM questions ORDER BY rowid",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(row_to_question).collect())
    }

    async fn find_by_category(&self, category: &str) -> Result<Vec<Question>> {
        let rows = sqlx::query(
            "SELECT id, text, category, answer, feature_vector, keyword_1, keyword_2, keyword_3 \
             FROM questions WHERE category = ? ORDER BY rowid",
        )
        .bind(category)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(row_to_question).collect())
    }

    async fn find_by_text(&self, text: &str) -> Result<Option<Question>> {
        let row = sqlx::query(
            "SELECT id, text, category, answer, feature_vector, keyword_1, keyword_2, keyword_3 \
             FROM questions WHERE text = ? LIMIT 1",
        )
        .bind(text)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(row_to_question))
    }

    async fn insert(&self, question: &Question) -> Result<String> {
        check_insertable(question)?;

        let hash = question.dedup_hash();
        let existing: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM questions WHERE dedup_hash = ?")
                .bind(&hash)
                .fetch_one(&self.pool)
                .await?;
        if existing > 0 {
            return Err(MatchError::InsertionRejected(InsertionRejection::Duplicate).into());
        }

        let id = Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO questions (id, text, category, answer, feature_vector, \
             keyword_1, keyword_2, keyword_3, dedup_hash, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&question.text)
        .bind(&question.category)
        .bind(&question.answer)
        .bind(vec_to_blob(&question.feature_vector))
        .bind(&question.keyword_1)
        .bind(&question.keyword_2)
        .bind(&question.keyword_3)
        .bind(&hash)
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await?;

        Ok(id)
    }

    async fn count(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM questions")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }

    async fn keyword_counts(&self, n: usize) -> Result<Vec<(String, u64)>> {
        let rows = sqlx::query(
            r#"
            SELECT keyword, COUNT(*) AS n FROM (
                SELECT keyword_1 AS keyword FROM questions WHERE keyword_1 IS NOT NULL
                UNION ALL
                SELECT keyword_2 FROM questions WHERE keyword_2 IS NOT NULL
                UNION ALL
                SELECT keyword_3 FROM questions WHERE keyword_3 IS NOT NULL
            )
            GROUP BY keyword
            ORDER BY n DESC, keyword ASC
            LIMIT ?
            "#,
        )
        .bind(n as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| {
                let keyword: String = row.get("keyword");
                let count: i64 = row.get("n");
                (keyword, count as u64)
            })
            .collect())
    }
}

#[async_trait]
impl QueryLog for SqliteStore {
    async fn insert(&self, query: &Query) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO queries (id, chat, morphs_json, matched_question, category, answer, \
             jaccard_similarity, manhattan_similarity, measurement, added_time) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&query.chat)
        .bind(serde_json::to_string(&query.morphs)?)
        .bind(&query.matched_question)
        .bind(&query.category)
        .bind(&query.answer)
        .bind(query.jaccard_similarity)
        .bind(query.manhattan_similarity)
        .bind(query.measurement.as_str())
        .bind(query.added_time.timestamp())
        .execute(&self.pool)
        .await?;

        Ok(id)
    }

    async fn find_recent(&self, n: usize) -> Result<Vec<Query>> {
        let rows = sqlx::query(
            "SELECT chat, morphs_json, matched_question, category, answer, \
             jaccard_similarity, manhattan_similarity, measurement, added_time \
             FROM queries ORDER BY added_time DESC, rowid DESC LIMIT ?",
        )
        .bind(n as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_query).collect()
    }
}
