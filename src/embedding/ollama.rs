//! Ollama embedding client
//!
//! Endpoint: POST /api/embeddings with `{model, prompt}`.

use async_trait::async_trait;
use futures_util::{stream, StreamExt, TryStreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::Embedder;
use crate::completion::retry::RetryManager;
use crate::errors::{QaError, Result};

const SERVICE: &str = "embedding";
const BATCH_CONCURRENCY: usize = 4;

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

#[derive(Debug, Clone)]
pub struct OllamaEmbedder {
    client: Client,
    base_url: String,
    model: String,
    timeout: Duration,
    retry: RetryManager,
}

impl OllamaEmbedder {
    pub fn new(base_url: &str, model: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(QaError::HttpError)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            timeout,
            retry: RetryManager::new(),
        })
    }

    pub fn with_retry(mut self, retry: RetryManager) -> Self {
        self.retry = retry;
        self
    }

    async fn request(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/api/embeddings", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&EmbeddingRequest {
                model: &self.model,
                prompt: text,
            })
            .send()
            .await
            .map_err(|e| QaError::from_request(e, SERVICE, self.timeout))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(QaError::from_status(SERVICE, status, &error_text));
        }

        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| QaError::unavailable(SERVICE, format!("Failed to parse response: {}", e)))?;

        if body.embedding.is_empty() {
            return Err(QaError::unavailable(
                SERVICE,
                format!("model '{}' returned an empty embedding", self.model),
            ));
        }

        Ok(body.embedding)
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn model(&self) -> &str {
        &self.model
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(model = %self.model, chars = text.len(), "embedding text");
        self.retry.execute_with_retry(|| self.request(text)).await
    }

    /// A few requests in flight at once; results keep input order
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let requests: Vec<_> = texts.iter().map(|text| self.embed(text)).collect();
        stream::iter(requests)
            .buffered(BATCH_CONCURRENCY)
            .try_collect()
            .await
    }
}
