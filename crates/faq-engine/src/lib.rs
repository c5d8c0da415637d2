//! # FAQ Engine
//!
//! The matching core of a FAQ-answering chat engine: an incoming chat
//! utterance is scored against a corpus of curated question/answer
//! records, combining a lexical token-overlap signal (Jaccard) with an
//! optional semantic signal (distance over weighted-average embedding
//! vectors), and every resolved query is persisted as an auditable
//! record.
//!
//! ## Data Flow
//!
//! ```text
//! chat text ──▶ normalizer ──▶ (cleaned text, morphs)
//!                  │
//!                  ▼
//!            embedding server ──▶ weighted average vector
//!                  │
//!                  ▼
//!          similarity scorer ──▶ semantic + lexical rankings
//!                  │
//!                  ▼
//!          decision chain ──▶ query record ──▶ query log ──▶ response
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`db`] | SQLite connection pool |
//! | [`migrate`] | Idempotent schema migrations |
//! | [`sqlite_store`] | SQLite-backed question corpus and query log |
//! | [`normalizer`] | Text cleaning / morphological analysis providers |
//! | [`embedding`] | Embedding model server providers |
//! | [`handler`] | Façade: match, persist, shape the response payload |
//! | [`ingest`] | Corpus loading from JSONL files |
//! | [`analysis`] | Lexical/semantic diagnostics and keyword analytics |
//!
//! Pure matching logic (scorer, decision pipeline, data model, store
//! traits) lives in the `faq-engine-core` crate.

pub mod analysis;
pub mod config;
pub mod db;
pub mod embedding;
pub mod handler;
pub mod ingest;
pub mod migrate;
pub mod normalizer;
pub mod sqlite_store;
