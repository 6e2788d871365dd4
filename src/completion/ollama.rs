//! Ollama completion client
//!
//! Endpoint: POST /api/generate, non-streaming. The model name travels with
//! each call so one client can serve several models.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::retry::RetryManager;
use super::CompletionService;
use crate::errors::{QaError, Result};

const SERVICE: &str = "completion";

/// Ollama generate request
#[derive(Debug, Clone, Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<serde_json::Value>,
}

/// Ollama generate response (non-streaming)
#[derive(Debug, Deserialize)]
struct OllamaGenerateResponse {
    response: String,
}

#[derive(Debug, Clone)]
pub struct OllamaCompletion {
    client: Client,
    base_url: String,
    timeout: Duration,
    temperature: Option<f32>,
    retry: RetryManager,
}

impl OllamaCompletion {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(QaError::HttpError)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
            temperature: None,
            retry: RetryManager::new(),
        })
    }

    pub fn with_retry(mut self, retry: RetryManager) -> Self {
        self.retry = retry;
        self
    }

    /// Fix the sampling temperature, e.g. 0.0 for repeatable answers
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn request(&self, prompt: &str, model_name: &str) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);

        let request = OllamaGenerateRequest {
            model: model_name,
            prompt,
            stream: false,
            options: self
                .temperature
                .map(|t| serde_json::json!({ "temperature": t })),
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| QaError::from_request(e, SERVICE, self.timeout))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(QaError::from_status(SERVICE, status, &error_text));
        }

        let body: OllamaGenerateResponse = response
            .json()
            .await
            .map_err(|e| QaError::unavailable(SERVICE, format!("Failed to parse response: {}", e)))?;

        Ok(body.response)
    }
}

#[async_trait]
impl CompletionService for OllamaCompletion {
    async fn complete(&self, prompt: &str, model_name: &str) -> Result<String> {
        debug!(model = model_name, prompt_chars = prompt.len(), "requesting completion");
        self.retry
            .execute_with_retry(|| self.request(prompt, model_name))
            .await
    }
}
