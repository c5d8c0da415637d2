//! Corpus ingestion: load curated question/answer records from a JSONL
//! file, embed each question, and insert it into the corpus store.
//!
//! One JSON object per line:
//!
//! ```json
//! {"text": "셔틀 언제 오나요?", "answer": "9시부터 20분 간격입니다.",
//!  "category": "shuttle", "keywords": ["셔틀", "시간"]}
//! ```
//!
//! A record whose embedding cannot be produced is rejected and counted —
//! a question is never stored with a null vector. Duplicate texts are
//! rejected by the store and counted separately.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::warn;

use faq_engine_core::error::{InsertionRejection, MatchError};
use faq_engine_core::matcher::QueryMaker;
use faq_engine_core::store::QuestionStore;

#[derive(Debug, Deserialize)]
struct CorpusRecord {
    text: String,
    answer: String,
    #[serde(default)]
    category: Option<String>,
    /// Up to three keywords, ordered by importance; extras are dropped.
    #[serde(default)]
    keywords: Vec<String>,
}

/// Outcome counters for one corpus load.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestReport {
    pub inserted: usize,
    pub rejected: usize,
    pub duplicates: usize,
}

/// Load a JSONL corpus file into the question store.
///
/// Malformed JSON aborts the load (the file itself is broken); per-record
/// embedding failures and store rejections are counted and skipped.
pub async fn load_corpus(
    store: &dyn QuestionStore,
    maker: &QueryMaker,
    path: &Path,
) -> Result<IngestReport> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read corpus file: {}", path.display()))?;

    let mut report = IngestReport::default();

    for (lineno, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let record: CorpusRecord = serde_json::from_str(line)
            .with_context(|| format!("Invalid corpus record on line {}", lineno + 1))?;

        let question = match maker
            .make_question(
                &record.text,
                &record.answer,
                record.category.clone(),
                &record.keywords,
            )
            .await
        {
            Ok(question) => question,
            Err(e) => {
                warn!(line = lineno + 1, error = %e, "question rejected");
                report.rejected += 1;
                continue;
            }
        };

        match store.insert(&question).await {
            Ok(_) => report.inserted += 1,
            Err(e) => match e.downcast_ref::<MatchError>() {
                Some(MatchError::InsertionRejected(InsertionRejection::Duplicate)) => {
                    warn!(line = lineno + 1, text = %record.text, "duplicate question skipped");
                    report.duplicates += 1;
                }
                Some(MatchError::InsertionRejected(_)) => {
                    warn!(line = lineno + 1, error = %e, "question rejected by store");
                    report.rejected += 1;
                }
                _ => return Err(e),
            },
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::io::Write;
    use std::sync::Arc;

    use faq_engine_core::matcher::MatchParams;
    use faq_engine_core::provider::Embedder;
    use faq_engine_core::store::memory::MemoryStore;
    use faq_engine_core::tags::TagPolicy;

    use crate::embedding::DisabledEmbedder;
    use crate::normalizer::SimpleNormalizer;

    struct UnitEmbedder;

    #[async_trait]
    impl Embedder for UnitEmbedder {
        fn model_name(&self) -> &str {
            "unit"
        }
        fn dims(&self) -> usize {
            2
        }
        async fn embed_tokens(&self, tokens: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(tokens.iter().map(|_| vec![1.0, 0.0]).collect())
        }
    }

    fn maker(embedder: Arc<dyn Embedder>) -> QueryMaker {
        QueryMaker::new(
            Arc::new(SimpleNormalizer),
            embedder,
            MatchParams::default(),
            TagPolicy::default(),
        )
    }

    fn corpus_file(lines: &[&str]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
        file
    }

    #[tokio::test]
    async fn test_load_inserts_questions() {
        let store = MemoryStore::new();
        let file = corpus_file(&[
            r#"{"text": "셔틀 언제 오나요?", "answer": "9시부터 20분 간격입니다.", "category": "shuttle", "keywords": ["셔틀"]}"#,
            r#"{"text": "식당 어디에요?", "answer": "학생회관 2층입니다."}"#,
        ]);

        let report = load_corpus(&store, &maker(Arc::new(UnitEmbedder)), file.path())
            .await
            .unwrap();
        assert_eq!(report, IngestReport { inserted: 2, rejected: 0, duplicates: 0 });
        assert_eq!(store.count().await.unwrap(), 2);
        let q = store.find_by_text("셔틀 언제 오나요?").await.unwrap().unwrap();
        assert_eq!(q.keyword_1.as_deref(), Some("셔틀"));
        assert!(!q.feature_vector.is_empty());
    }

    #[tokio::test]
    async fn test_load_rejects_all_without_embedder() {
        let store = MemoryStore::new();
        let file = corpus_file(&[
            r#"{"text": "셔틀 언제 오나요?", "answer": "a"}"#,
            r#"{"text": "식당 어디에요?", "answer": "b"}"#,
        ]);

        let report = load_corpus(&store, &maker(Arc::new(DisabledEmbedder)), file.path())
            .await
            .unwrap();
        assert_eq!(report, IngestReport { inserted: 0, rejected: 2, duplicates: 0 });
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_load_counts_duplicates() {
        let store = MemoryStore::new();
        let file = corpus_file(&[
            r#"{"text": "셔틀 언제 오나요?", "answer": "a"}"#,
            r#"{"text": "셔틀 언제 오나요?", "answer": "b"}"#,
        ]);

        let report = load_corpus(&store, &maker(Arc::new(UnitEmbedder)), file.path())
            .await
            .unwrap();
        assert_eq!(report, IngestReport { inserted: 1, rejected: 0, duplicates: 1 });
    }

    #[tokio::test]
    async fn test_malformed_line_aborts() {
        let store = MemoryStore::new();
        let file = corpus_file(&["not json"]);
        let err = load_corpus(&store, &maker(Arc::new(UnitEmbedder)), file.path())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("line 1"));
    }
}
