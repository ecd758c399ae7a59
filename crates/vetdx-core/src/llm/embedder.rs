//! HTTP-based embedder using an external embeddings service
//!
//! Talks to any OpenAI-compatible `/v1/embeddings` endpoint.

use crate::config::EmbeddingServiceConfig;
use crate::error::{Result, VetDxError};
use crate::llm::Embedder;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Embedder backed by an external HTTP service
pub struct HttpEmbedder {
    client: reqwest::Client,
    config: EmbeddingServiceConfig,
    dimensions: usize,
}

impl HttpEmbedder {
    /// Create from configuration
    pub fn new(config: EmbeddingServiceConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(VetDxError::Http)?;

        let dimensions = config.dimensions.unwrap_or(384);

        Ok(Self {
            client,
            config,
            dimensions,
        })
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(EmbeddingServiceConfig::default())
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let results = self.embed_batch(&[text.to_string()]).await?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| VetDxError::Llm("No embedding returned".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        #[derive(Serialize)]
        struct EmbedRequest<'a> {
            model: &'a str,
            input: &'a [String],
        }

        #[derive(Deserialize)]
        struct EmbedResponse {
            data: Vec<EmbedData>,
        }

        #[derive(Deserialize)]
        struct EmbedData {
            embedding: Vec<f32>,
        }

        if texts.is_empty() {
            return Ok(Vec::new());
        }

        tracing::debug!("Embedding batch of {} texts", texts.len());

        let request = EmbedRequest {
            model: &self.config.model,
            input: texts,
        };

        let url = format!("{}/v1/embeddings", self.config.url);

        let mut req = self.client.post(&url).json(&request);
        if let Some(ref api_key) = self.config.api_key {
            req = req.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = req.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(VetDxError::Provider(format!(
                "Embedding service error (HTTP {}): {}",
                status, body
            )));
        }

        let parsed: EmbedResponse = response.json().await?;

        if parsed.data.len() != texts.len() {
            return Err(VetDxError::Llm(format!(
                "Embedding service returned {} vectors for {} inputs",
                parsed.data.len(),
                texts.len()
            )));
        }

        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}
