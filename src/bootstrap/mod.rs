//! Bootstrap checks for docqa
//! 
//! Detects a running Ollama and checks that both the completion and the
//! embedding model have been pulled.

use crate::config::Config;
use crate::errors::{QaError, Result};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

const SERVICE: &str = "ollama";

/// Ollama reachability and model checker
pub struct HealthCheck {
    client: Client,
    ollama_url: String,
}

/// Ollama API tags response
#[derive(Debug, Deserialize)]
struct TagsResponse {
    models: Vec<ModelInfo>,
}

/// Model information from Ollama API
#[derive(Debug, Deserialize)]
struct ModelInfo {
    name: String,
}

/// Bootstrap check result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapStatus {
    Ready,
    OllamaNotRunning,
    ModelNotAvailable(String),
}

impl HealthCheck {
    pub fn new(ollama_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .map_err(QaError::HttpError)?;

        Ok(Self {
            client,
            ollama_url: ollama_url.trim_end_matches('/').to_string(),
        })
    }

    /// Check if Ollama API is reachable
    pub async fn check_ollama_running(&self) -> bool {
        let url = format!("{}/api/tags", self.ollama_url);
        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    /// Names of locally pulled models
    pub async fn list_models(&self) -> Result<Vec<String>> {
        let url = format!("{}/api/tags", self.ollama_url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| QaError::unavailable(SERVICE, format!("Failed to query models: {}", e)))?;

        if !response.status().is_success() {
            return Err(QaError::unavailable(
                SERVICE,
                format!("API returned status: {}", response.status()),
            ));
        }

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| QaError::unavailable(SERVICE, format!("Failed to parse response: {}", e)))?;

        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    /// Check Ollama, then each model in order; first problem wins
    pub async fn check(&self, models: &[&str]) -> Result<BootstrapStatus> {
        if !self.check_ollama_running().await {
            return Ok(BootstrapStatus::OllamaNotRunning);
        }

        let available = self.list_models().await?;
        for model in models {
            if !available.iter().any(|name| model_matches(name, model)) {
                return Ok(BootstrapStatus::ModelNotAvailable(model.to_string()));
            }
        }

        Ok(BootstrapStatus::Ready)
    }

    /// Check the completion and embedding models named in `config`
    pub async fn check_config(&self, config: &Config) -> Result<BootstrapStatus> {
        self.check(&[
            config.ollama.completion_model.as_str(),
            config.ollama.embedding_model.as_str(),
        ])
        .await
    }

    /// Display installation instructions for Ollama
    pub fn show_ollama_install_instructions() {
        eprintln!("\n❌ Ollama not found or not running!");
        eprintln!("\nOllama is required to embed questions and generate answers.");
        eprintln!("\n📦 Installation:");
        eprintln!("   Linux:   curl -fsSL https://ollama.com/install.sh | sh");
        eprintln!("   macOS:   brew install ollama");
        eprintln!("\n🚀 Start Ollama:");
        eprintln!("   ollama serve");
        eprintln!();
    }

    /// Display instructions for pulling a model
    pub fn show_model_pull_instructions(model_tag: &str) {
        eprintln!("\n❌ Model '{}' not found!", model_tag);
        eprintln!("\nTo download this model, run:");
        eprintln!("   ollama pull {}", model_tag);
        eprintln!("\nOr choose a different model with --model / --embedding-model.");
        eprintln!();
    }
}

/// `llama3.1` matches `llama3.1:latest`; explicit tags must match exactly
fn model_matches(available: &str, wanted: &str) -> bool {
    if available == wanted {
        return true;
    }
    !wanted.contains(':') && available.strip_suffix(":latest") == Some(wanted)
}

/// Exit code for setup needed
pub const EXIT_CODE_SETUP_NEEDED: i32 = 2;
