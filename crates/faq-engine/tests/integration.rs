//! End-to-end tests of the matching engine over the SQLite store:
//! corpus ingestion, semantic and degraded matching, query-log audit,
//! and insertion rejection.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tempfile::TempDir;

use faq_engine::config::{Config, DbConfig};
use faq_engine::db;
use faq_engine::embedding::DisabledEmbedder;
use faq_engine::handler::Handler;
use faq_engine::migrate;
use faq_engine::normalizer::SimpleNormalizer;
use faq_engine::sqlite_store::SqliteStore;
use faq_engine_core::error::{InsertionRejection, MatchError};
use faq_engine_core::matcher::{MatchParams, QueryMaker};
use faq_engine_core::models::{Measurement, Morph, Query, Question};
use faq_engine_core::provider::Embedder;
use faq_engine_core::store::{QueryLog, QuestionStore};
use faq_engine_core::tags::TagPolicy;

/// Deterministic token-level embedder standing in for the model server.
struct MapEmbedder(HashMap<String, Vec<f32>>);

impl MapEmbedder {
    fn campus() -> Self {
        let mut map = HashMap::new();
        map.insert("셔틀".to_string(), vec![1.0, 0.0]);
        map.insert("언제".to_string(), vec![0.0, 1.0]);
        map.insert("와".to_string(), vec![0.5, 0.5]);
        map.insert("오나요".to_string(), vec![0.5, 0.5]);
        map.insert("식당".to_string(), vec![10.0, 0.0]);
        map.insert("어디에요".to_string(), vec![0.0, 10.0]);
        Self(map)
    }
}

#[async_trait]
impl Embedder for MapEmbedder {
    fn model_name(&self) -> &str {
        "map"
    }
    fn dims(&self) -> usize {
        2
    }
    async fn embed_tokens(&self, tokens: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(tokens
            .iter()
            .map(|t| self.0.get(t).cloned().unwrap_or(vec![0.0, 0.0]))
            .collect())
    }
}

async fn setup_store() -> (TempDir, Arc<SqliteStore>) {
    let tmp = TempDir::new().unwrap();
    let config = Config {
        db: DbConfig {
            path: tmp.path().join("data").join("faq.sqlite"),
        },
        matching: Default::default(),
        embedding: Default::default(),
        normalizer: Default::default(),
        tags: Default::default(),
    };
    let pool = db::connect(&config).await.unwrap();
    migrate::run_migrations(&pool).await.unwrap();
    (tmp, Arc::new(SqliteStore::new(pool)))
}

fn make_maker(embedder: Arc<dyn Embedder>) -> QueryMaker {
    QueryMaker::new(
        Arc::new(SimpleNormalizer),
        embedder,
        MatchParams::default(),
        TagPolicy::default(),
    )
}

fn make_handler(store: Arc<SqliteStore>, embedder: Arc<dyn Embedder>) -> Handler {
    let corpus: Arc<dyn QuestionStore> = store.clone();
    let log: Arc<dyn QueryLog> = store;
    Handler::new(make_maker(embedder), corpus, log)
}

async fn load_campus_corpus(store: &SqliteStore) {
    let maker = make_maker(Arc::new(MapEmbedder::campus()));
    for (text, answer, category) in [
        ("셔틀 언제 오나요?", "9시부터 20분 간격입니다.", "shuttle"),
        ("식당 어디에요?", "학생회관 2층입니다.", "dining"),
    ] {
        let question = maker
            .make_question(text, answer, Some(category.to_string()), &[])
            .await
            .unwrap();
        QuestionStore::insert(store, &question).await.unwrap();
    }
}

#[tokio::test]
async fn test_semantic_match_end_to_end() {
    let (_tmp, store) = setup_store().await;
    load_campus_corpus(&store).await;
    let handler = make_handler(store.clone(), Arc::new(MapEmbedder::campus()));

    let response = handler.handle("셔틀 언제 와?", None).await.unwrap();
    assert_eq!(response.with.as_deref(), Some("셔틀 언제 오나요?"));
    assert_eq!(response.measurement, Measurement::Manhattan);
    assert_eq!(response.distance, Some(0.0));
    assert_eq!(response.answer, "9시부터 20분 간격입니다.");
    assert_eq!(response.category.as_deref(), Some("shuttle"));

    let recent = store.find_recent(10).await.unwrap();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].chat, "셔틀 언제 와?");
    assert_eq!(recent[0].measurement, Measurement::Manhattan);
    assert_eq!(recent[0].manhattan_similarity, Some(0.0));
}

#[tokio::test]
async fn test_embedder_outage_degrades_to_jaccard() {
    let (_tmp, store) = setup_store().await;
    load_campus_corpus(&store).await;
    // corpus was built with vectors, but this call cannot embed
    let handler = make_handler(store.clone(), Arc::new(DisabledEmbedder));

    let response = handler.handle("셔틀 언제 와?", None).await.unwrap();
    assert_eq!(response.with.as_deref(), Some("셔틀 언제 오나요?"));
    assert_eq!(response.measurement, Measurement::Jaccard);
    assert_eq!(response.distance, Some(0.5));

    let recent = store.find_recent(1).await.unwrap();
    assert_eq!(recent[0].measurement, Measurement::Jaccard);
    assert_eq!(recent[0].manhattan_similarity, None);
}

#[tokio::test]
async fn test_repeated_queries_are_deterministic() {
    let (_tmp, store) = setup_store().await;
    load_campus_corpus(&store).await;
    let handler = make_handler(store.clone(), Arc::new(MapEmbedder::campus()));

    let first = handler.handle("셔틀 언제 와?", None).await.unwrap();
    let second = handler.handle("셔틀 언제 와?", None).await.unwrap();
    assert_eq!(first.with, second.with);
    assert_eq!(first.measurement, second.measurement);
    assert_eq!(first.distance, second.distance);

    // one persisted record per resolution
    let recent = store.find_recent(10).await.unwrap();
    assert_eq!(recent.len(), 2);
}

#[tokio::test]
async fn test_empty_corpus_falls_back_without_error() {
    let (_tmp, store) = setup_store().await;
    let handler = make_handler(store.clone(), Arc::new(DisabledEmbedder));

    let response = handler.handle("셔틀 언제 와?", None).await.unwrap();
    assert_eq!(response.with, None);
    assert_eq!(response.answer, MatchParams::default().fallback_answer);
    assert_eq!(store.find_recent(10).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_feature_vector_roundtrip() {
    let (_tmp, store) = setup_store().await;
    let question = Question {
        text: "셔틀 언제 오나요?".into(),
        category: Some("shuttle".into()),
        answer: "a".into(),
        feature_vector: vec![0.25, -1.5, 3.125, 0.0],
        keyword_1: Some("셔틀".into()),
        keyword_2: None,
        keyword_3: None,
        object_id: None,
    };
    QuestionStore::insert(store.as_ref(), &question).await.unwrap();

    let all = store.find_all().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].feature_vector, vec![0.25, -1.5, 3.125, 0.0]);
    assert_eq!(all[0].keyword_1.as_deref(), Some("셔틀"));
    assert!(all[0].object_id.is_some());
}

#[tokio::test]
async fn test_insert_rejects_missing_vector() {
    let (_tmp, store) = setup_store().await;
    let question = Question {
        text: "빈 벡터".into(),
        category: None,
        answer: "a".into(),
        feature_vector: Vec::new(),
        keyword_1: None,
        keyword_2: None,
        keyword_3: None,
        object_id: None,
    };
    let err = QuestionStore::insert(store.as_ref(), &question)
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<MatchError>(),
        Some(MatchError::InsertionRejected(InsertionRejection::MissingVector))
    ));
    assert_eq!(store.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_insert_rejects_duplicate_text() {
    let (_tmp, store) = setup_store().await;
    let question = Question {
        text: "셔틀 언제 오나요?".into(),
        category: None,
        answer: "a".into(),
        feature_vector: vec![1.0],
        keyword_1: None,
        keyword_2: None,
        keyword_3: None,
        object_id: None,
    };
    QuestionStore::insert(store.as_ref(), &question).await.unwrap();
    let err = QuestionStore::insert(store.as_ref(), &question)
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<MatchError>(),
        Some(MatchError::InsertionRejected(InsertionRejection::Duplicate))
    ));
    assert_eq!(store.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_find_by_category_and_text() {
    let (_tmp, store) = setup_store().await;
    load_campus_corpus(&store).await;

    let shuttle = store.find_by_category("shuttle").await.unwrap();
    assert_eq!(shuttle.len(), 1);
    assert_eq!(shuttle[0].text, "셔틀 언제 오나요?");

    let found = store.find_by_text("식당 어디에요?").await.unwrap();
    assert!(found.is_some());
    assert!(store.find_by_text("없는 질문").await.unwrap().is_none());
}

#[tokio::test]
async fn test_keyword_counts_over_sqlite() {
    let (_tmp, store) = setup_store().await;
    for (text, keywords) in [
        ("q1", vec!["셔틀", "시간"]),
        ("q2", vec!["셔틀"]),
        ("q3", vec!["식당"]),
    ] {
        let question = Question {
            text: text.into(),
            category: None,
            answer: "a".into(),
            feature_vector: vec![1.0],
            keyword_1: keywords.first().map(|k| k.to_string()),
            keyword_2: keywords.get(1).map(|k| k.to_string()),
            keyword_3: None,
            object_id: None,
        };
        QuestionStore::insert(store.as_ref(), &question).await.unwrap();
    }

    let counts = store.keyword_counts(10).await.unwrap();
    assert_eq!(counts[0], ("셔틀".to_string(), 2));
    assert!(counts.contains(&("시간".to_string(), 1)));
    assert!(counts.contains(&("식당".to_string(), 1)));
}

#[tokio::test]
async fn test_query_log_roundtrip() {
    let (_tmp, store) = setup_store().await;
    let added = chrono::DateTime::from_timestamp(1_709_280_000, 0).unwrap();
    let query = Query {
        chat: "셔틀 언제 와?".into(),
        morphs: vec![Morph::new("셔틀", "word"), Morph::new("언제", "word")],
        matched_question: Some("셔틀 언제 오나요?".into()),
        category: Some("shuttle".into()),
        answer: "9시부터 20분 간격입니다.".into(),
        jaccard_similarity: Some(0.5),
        manhattan_similarity: Some(0.0),
        measurement: Measurement::Manhattan,
        added_time: added,
    };
    QueryLog::insert(store.as_ref(), &query).await.unwrap();

    let recent = store.find_recent(1).await.unwrap();
    let logged = &recent[0];
    assert_eq!(logged.chat, query.chat);
    assert_eq!(logged.morphs, query.morphs);
    assert_eq!(logged.matched_question, query.matched_question);
    assert_eq!(logged.jaccard_similarity, Some(0.5));
    assert_eq!(logged.manhattan_similarity, Some(0.0));
    assert_eq!(logged.measurement, Measurement::Manhattan);
    assert_eq!(logged.added_time, added);
}
