//! Text normalizer providers.
//!
//! The morphological analyzer is an external service; two providers
//! implement the [`Normalizer`] trait:
//! - **[`SimpleNormalizer`]** — offline whitespace/punctuation tokenizer.
//!   No POS knowledge: tokens are tagged `word` or `number`, punctuation
//!   runs go to the removed-tokens channel.
//! - **[`HttpNormalizer`]** — POSTs to a morphological analyzer service
//!   (`/clean`, `/morphs`) with timeout and retry.
//!
//! Use [`create_normalizer`] to instantiate from configuration. Callers
//! (the query maker) treat failures as degradation signals: the raw text
//! is used as already clean and scoring continues.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;

use faq_engine_core::error::MatchError;
use faq_engine_core::models::Morph;
use faq_engine_core::provider::Normalizer;

use crate::config::NormalizerConfig;

/// Offline tokenizer: strips punctuation/symbols into the removed
/// channel and tags the remaining whitespace-separated tokens.
pub struct SimpleNormalizer;

impl SimpleNormalizer {
    fn clean_sync(text: &str) -> (String, Vec<String>) {
        let mut kept = String::with_capacity(text.len());
        let mut removed = Vec::new();
        let mut pending = String::new();

        for ch in text.chars() {
            if ch.is_alphanumeric() || ch.is_whitespace() {
                if !pending.is_empty() {
                    removed.push(std::mem::take(&mut pending));
                }
                kept.push(ch);
            } else {
                pending.push(ch);
            }
        }
        if !pending.is_empty() {
            removed.push(pending);
        }

        let cleaned = kept.split_whitespace().collect::<Vec<_>>().join(" ");
        (cleaned, removed)
    }

    fn tag(token: &str) -> &'static str {
        if token.chars().all(|c| c.is_ascii_digit()) {
            "number"
        } else {
            "word"
        }
    }
}

#[async_trait]
impl Normalizer for SimpleNormalizer {
    async fn clean(&self, text: &str) -> Result<(String, Vec<String>)> {
        Ok(Self::clean_sync(text))
    }

    async fn morphs(&self, text: &str) -> Result<Vec<Morph>> {
        let (cleaned, _removed) = Self::clean_sync(text);
        Ok(cleaned
            .split_whitespace()
            .map(|t| Morph::new(t, Self::tag(t)))
            .collect())
    }
}

/// Remote morphological analyzer reached over HTTP.
///
/// `POST {url}/clean` with `{"text": ...}` returns
/// `{"cleaned": string, "removed": [string]}`; `POST {url}/morphs`
/// returns `{"morphs": [{"token": string, "tag": string}]}`.
pub struct HttpNormalizer {
    url: String,
    timeout_secs: u64,
    max_retries: u32,
}

impl HttpNormalizer {
    pub fn new(config: &NormalizerConfig) -> Result<Self> {
        let url = config
            .url
            .clone()
            .ok_or_else(|| anyhow::anyhow!("normalizer.url required for http provider"))?;
        Ok(Self {
            url,
            timeout_secs: config.timeout_secs,
            max_retries: config.max_retries,
        })
    }

    async fn post(&self, path: &str, text: &str) -> Result<serde_json::Value> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()?;

        let body = serde_json::json!({ "text": text });
        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = client
                .post(format!("{}{}", self.url, path))
                .header("Content-Type", "application/json")
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        return Ok(response.json().await?);
                    }

                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        last_err = Some(anyhow::anyhow!(
                            "normalizer error {}: {}",
                            status,
                            body_text
                        ));
                        continue;
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    bail!("normalizer error {}: {}", status, body_text);
                }
                Err(e) => {
                    last_err = Some(e.into());
                    continue;
                }
            }
        }

        let reason = last_err
            .map(|e| e.to_string())
            .unwrap_or_else(|| "failed after retries".to_string());
        Err(MatchError::Normalization(reason).into())
    }
}

#[async_trait]
impl Normalizer for HttpNormalizer {
    async fn clean(&self, text: &str) -> Result<(String, Vec<String>)> {
        let json = self.post("/clean", text).await?;
        let cleaned = json
            .get("cleaned")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow::anyhow!("invalid normalizer response: missing cleaned"))?
            .to_string();
        let removed = json
            .get("removed")
            .and_then(|v| v.as_array())
            .map(|a| {
                a.iter()
                    .filter_map(|v| v.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default();
        Ok((cleaned, removed))
    }

    async fn morphs(&self, text: &str) -> Result<Vec<Morph>> {
        let json = self.post("/morphs", text).await?;
        let morphs = json
            .get("morphs")
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("invalid normalizer response: missing morphs"))?;
        Ok(serde_json::from_value(morphs)?)
    }
}

/// Create the configured [`Normalizer`].
pub fn create_normalizer(config: &NormalizerConfig) -> Result<Arc<dyn Normalizer>> {
    match config.provider.as_str() {
        "simple" => Ok(Arc::new(SimpleNormalizer)),
        "http" => Ok(Arc::new(HttpNormalizer::new(config)?)),
        other => bail!("Unknown normalizer provider: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_clean_strips_punctuation_to_removed() {
        let (cleaned, removed) = SimpleNormalizer.clean("셔틀 언제 와?").await.unwrap();
        assert_eq!(cleaned, "셔틀 언제 와");
        assert_eq!(removed, vec!["?".to_string()]);
    }

    #[tokio::test]
    async fn test_clean_collapses_whitespace() {
        let (cleaned, removed) = SimpleNormalizer.clean("  a   b  ").await.unwrap();
        assert_eq!(cleaned, "a b");
        assert!(removed.is_empty());
    }

    #[tokio::test]
    async fn test_morphs_tags_numbers() {
        let morphs = SimpleNormalizer.morphs("9시 셔틀 30").await.unwrap();
        assert_eq!(morphs.len(), 3);
        assert_eq!(morphs[0], Morph::new("9시", "word"));
        assert_eq!(morphs[2], Morph::new("30", "number"));
    }

    #[tokio::test]
    async fn test_morphs_of_empty_text() {
        let morphs = SimpleNormalizer.morphs("?!").await.unwrap();
        assert!(morphs.is_empty());
    }

    #[test]
    fn test_create_normalizer_http_requires_url() {
        let config = NormalizerConfig {
            provider: "http".into(),
            ..Default::default()
        };
        assert!(create_normalizer(&config).is_err());
    }
}
