use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use faq_engine_core::matcher::MatchParams;
use faq_engine_core::tags::TagPolicy;
use faq_engine_core::vector::DistanceMetric;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub normalizer: NormalizerConfig,
    #[serde(default)]
    pub tags: TagsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MatchingConfig {
    /// Semantic acceptance threshold: a top candidate farther than this
    /// falls through to lexical selection.
    #[serde(default = "default_max_distance")]
    pub max_distance: f64,
    #[serde(default)]
    pub metric: DistanceMetric,
    /// Candidates retained by diagnostic commands.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_fallback_answer")]
    pub fallback_answer: String,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            max_distance: default_max_distance(),
            metric: DistanceMetric::default(),
            top_k: default_top_k(),
            fallback_answer: default_fallback_answer(),
        }
    }
}

fn default_max_distance() -> f64 {
    12.0
}
fn default_top_k() -> usize {
    3
}
fn default_fallback_answer() -> String {
    "Sorry, I couldn't find an answer for that.".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    /// `disabled`, `http`, or `openai`.
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    /// Base URL for the `http` provider.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_embedding_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: None,
            dims: None,
            url: None,
            timeout_secs: default_embedding_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

fn default_embedding_provider() -> String {
    "disabled".to_string()
}
fn default_embedding_timeout_secs() -> u64 {
    30
}
fn default_max_retries() -> u32 {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct NormalizerConfig {
    /// `simple` (offline tokenizer) or `http` (morphological analyzer
    /// service).
    #[serde(default = "default_normalizer_provider")]
    pub provider: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_normalizer_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_normalizer_retries")]
    pub max_retries: u32,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            provider: default_normalizer_provider(),
            url: None,
            timeout_secs: default_normalizer_timeout_secs(),
            max_retries: default_normalizer_retries(),
        }
    }
}

fn default_normalizer_provider() -> String {
    "simple".to_string()
}
fn default_normalizer_timeout_secs() -> u64 {
    10
}
fn default_normalizer_retries() -> u32 {
    2
}

#[derive(Debug, Deserialize, Clone)]
pub struct TagsConfig {
    /// Tags excluded from scoring (pure punctuation, symbols).
    #[serde(default = "default_non_content")]
    pub non_content: Vec<String>,
    /// Per-tag salience weights for the weighted average vector.
    #[serde(default)]
    pub weights: BTreeMap<String, f32>,
    #[serde(default = "default_tag_weight")]
    pub default_weight: f32,
}

impl Default for TagsConfig {
    fn default() -> Self {
        Self {
            non_content: default_non_content(),
            weights: BTreeMap::new(),
            default_weight: default_tag_weight(),
        }
    }
}

impl TagsConfig {
    pub fn policy(&self) -> TagPolicy {
        TagPolicy {
            non_content: self.non_content.iter().cloned().collect(),
            weights: self.weights.clone(),
            default_weight: self.default_weight,
        }
    }
}

fn default_non_content() -> Vec<String> {
    vec!["punct".to_string(), "symbol".to_string()]
}
fn default_tag_weight() -> f32 {
    1.0
}

impl Config {
    pub fn match_params(&self) -> MatchParams {
        MatchParams {
            max_distance: self.matching.max_distance,
            metric: self.matching.metric,
            top_k: self.matching.top_k,
            fallback_answer: self.matching.fallback_answer.clone(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.matching.max_distance <= 0.0 {
        anyhow::bail!("matching.max_distance must be > 0");
    }
    if config.matching.top_k < 1 {
        anyhow::bail!("matching.top_k must be >= 1");
    }
    if config.tags.default_weight < 0.0 {
        anyhow::bail!("tags.default_weight must be >= 0");
    }

    match config.embedding.provider.as_str() {
        "disabled" => {}
        "http" => {
            if config.embedding.url.is_none() {
                anyhow::bail!("embedding.url required for http provider");
            }
            require_model_and_dims(&config.embedding)?;
        }
        "openai" => require_model_and_dims(&config.embedding)?,
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be disabled, http, or openai.",
            other
        ),
    }

    match config.normalizer.provider.as_str() {
        "simple" => {}
        "http" => {
            if config.normalizer.url.is_none() {
                anyhow::bail!("normalizer.url required for http provider");
            }
        }
        other => anyhow::bail!(
            "Unknown normalizer provider: '{}'. Must be simple or http.",
            other
        ),
    }

    Ok(config)
}

fn require_model_and_dims(embedding: &EmbeddingConfig) -> Result<()> {
    if embedding.model.is_none() {
        anyhow::bail!(
            "embedding.model must be specified when provider is '{}'",
            embedding.provider
        );
    }
    match embedding.dims {
        None | Some(0) => anyhow::bail!(
            "embedding.dims must be > 0 when provider is '{}'",
            embedding.provider
        ),
        Some(_) => Ok(()),
    }
}
