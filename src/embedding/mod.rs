//! Text embedding services
//!
//! An `Embedder` maps text to a fixed-length vector. Stored chunks and
//! queries must go through the same model, which `spec()` identifies.

pub mod ollama;

use async_trait::async_trait;

use crate::errors::Result;
use crate::store::EmbeddingSpec;

pub use ollama::OllamaEmbedder;

#[async_trait]
pub trait Embedder: Send + Sync {
    /// Model name reported to the document store
    fn model(&self) -> &str;

    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed several texts, preserving input order
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }

    /// Spec describing a vector this embedder produced
    fn spec_for(&self, embedding: &[f32]) -> EmbeddingSpec {
        EmbeddingSpec::new(self.model(), embedding.len())
    }
}
