//! Embedding provider backed by an Ollama server

use crate::config::EmbedConfig;
use crate::error::{EmbedError, Result};
use crate::provider::{EmbeddingProvider, EmbeddingResult, to_f16};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Calls `POST {base_url}/api/embed` in batches of `batch_size` texts.
///
/// The embedding dimension is learned from the first response and checked
/// against every later one. Vectors holding NaN or infinite values are rejected.
#[derive(Debug)]
pub struct OllamaEmbeddingProvider {
    config: EmbedConfig,
    client: reqwest::Client,
    dimension: AtomicUsize,
}

impl OllamaEmbeddingProvider {
    pub fn new(config: EmbedConfig) -> Result<Self> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        tracing::info!(
            "Using Ollama embeddings: model {} at {}",
            config.model,
            config.base_url
        );

        Ok(Self {
            config,
            client,
            dimension: AtomicUsize::new(0),
        })
    }

    pub fn config(&self) -> &EmbedConfig {
        &self.config
    }

    async fn embed_batch(&self, batch: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = EmbedRequest {
            model: &self.config.model,
            input: batch,
        };

        let response = self
            .client
            .post(self.config.embed_endpoint())
            .json(&request)
            .send()
            .await?
            .error_for_status()?;

        let body: EmbedResponse = response.json().await?;
        if body.embeddings.len() != batch.len() {
            return Err(EmbedError::unexpected_response(format!(
                "asked for {} embeddings, got {}",
                batch.len(),
                body.embeddings.len()
            )));
        }

        Ok(body.embeddings)
    }

    fn check_embedding(&self, embedding: &[f32]) -> Result<()> {
        let seen = embedding.len();
        if seen == 0 {
            return Err(EmbedError::unexpected_response("empty embedding vector"));
        }
        if embedding.iter().any(|v| !v.is_finite()) {
            return Err(EmbedError::unexpected_response(
                "embedding contains NaN or infinite values",
            ));
        }
        match self
            .dimension
            .compare_exchange(0, seen, Ordering::SeqCst, Ordering::SeqCst)
        {
            Ok(_) => {
                tracing::debug!("Learned embedding dimension {seen} for {}", self.config.model);
                Ok(())
            }
            Err(known) if known == seen => Ok(()),
            Err(known) => Err(EmbedError::unexpected_response(format!(
                "embedding dimension changed from {known} to {seen}"
            ))),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbeddingProvider {
    async fn embed_texts(&self, texts: &[String]) -> Result<EmbeddingResult> {
        if texts.is_empty() {
            return Ok(EmbeddingResult::new(vec![]));
        }

        tracing::debug!("Generating embeddings for {} texts", texts.len());
        let mut all_embeddings = Vec::with_capacity(texts.len());

        for batch in texts.chunks(self.config.batch_size) {
            for embedding in self.embed_batch(batch).await? {
                self.check_embedding(&embedding)?;
                all_embeddings.push(to_f16(&embedding, self.config.normalize));
            }
        }

        Ok(EmbeddingResult::new(all_embeddings))
    }

    fn embedding_dimension(&self) -> usize {
        self.dimension.load(Ordering::SeqCst)
    }

    fn provider_name(&self) -> &str {
        "ollama"
    }
}
