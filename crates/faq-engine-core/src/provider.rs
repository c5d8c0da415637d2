//! Collaborator traits: the morphological normalizer and the embedding
//! model server.
//!
//! Both are external services reached across a process/network boundary;
//! implementations live in the app crate and must bound every call with a
//! timeout. The match pipeline treats their failures as degradation
//! signals, not fatal errors.

use anyhow::Result;
use async_trait::async_trait;

use crate::models::Morph;

/// Text cleaning and morphological analysis.
#[async_trait]
pub trait Normalizer: Send + Sync {
    /// Clean raw text: returns the cleaned text plus the tokens that
    /// were removed (punctuation runs, stripped symbols).
    async fn clean(&self, text: &str) -> Result<(String, Vec<String>)>;

    /// Extract ordered morphological token/tag pairs from text.
    async fn morphs(&self, text: &str) -> Result<Vec<Morph>>;
}

/// Embedding model server: tokens in, one feature vector per token out.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Model identifier (e.g. `"multilingual-e5-small"`).
    fn model_name(&self) -> &str;

    /// Embedding vector dimensionality.
    fn dims(&self) -> usize;

    /// Embed a batch of tokens, returning one vector per token in the
    /// same order. May fail transiently; callers degrade to lexical-only
    /// scoring and never fabricate a placeholder vector.
    async fn embed_tokens(&self, tokens: &[String]) -> Result<Vec<Vec<f32>>>;
}
