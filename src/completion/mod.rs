//! LLM completion services
//!
//! The adapter only builds the request and passes the answer text through;
//! every failure surfaces as service-unavailable.

pub mod ollama;
pub mod retry;

use async_trait::async_trait;

use crate::errors::Result;

pub use ollama::OllamaCompletion;
pub use retry::RetryManager;

#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, prompt: &str, model_name: &str) -> Result<String>;
}
