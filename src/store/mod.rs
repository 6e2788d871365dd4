//! Document store: rows of (identifier, chunk text, embedding)
//!
//! The query path only calls `search`; ingestion calls `append`,
//! `remove_document` and `clear`. Every backend returns typed `ScoredChunk` rows ranked by
//! descending cosine similarity with a deterministic tie-break.

pub mod memory;
pub mod qdrant;
pub mod types;

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::{Config, StoreBackend};
use crate::errors::{QaError, Result};

pub use memory::MemoryStore;
pub use qdrant::QdrantStore;
pub use types::{Chunk, EmbeddingSpec, ScoredChunk};

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Write chunks embedded with `spec`, replacing any row with the same
    /// identifier and index; returns the number written
    async fn append(&self, spec: &EmbeddingSpec, chunks: Vec<Chunk>) -> Result<usize>;

    /// Top `k` chunks by cosine similarity to `embedding`
    async fn search(
        &self,
        spec: &EmbeddingSpec,
        embedding: &[f32],
        k: usize,
    ) -> Result<Vec<ScoredChunk>>;

    async fn count(&self) -> Result<u64>;

    /// Drop every chunk of one document; returns the number removed
    async fn remove_document(&self, source_identifier: &str) -> Result<u64>;

    /// Drop every chunk and forget the recorded embedding spec
    async fn clear(&self) -> Result<()>;

    /// Spec recorded on first append, None while empty
    async fn embedding_spec(&self) -> Result<Option<EmbeddingSpec>>;
}

/// Open the backend selected in configuration
pub async fn open_store(config: &Config) -> Result<Arc<dyn DocumentStore>> {
    match config.store.backend {
        StoreBackend::Memory => {
            let store = MemoryStore::open(config.store_path())?;
            Ok(Arc::new(store))
        }
        StoreBackend::Qdrant => {
            let store = QdrantStore::connect(&config.store.qdrant_url, &config.store.collection)?;
            Ok(Arc::new(store))
        }
    }
}

/// Cosine similarity in [-1, 1]; zero vectors score 0
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0)
}

/// Sort into rank order and keep the first `k`
pub fn rank(mut scored: Vec<ScoredChunk>, k: usize) -> Vec<ScoredChunk> {
    scored.sort_by(ScoredChunk::rank_order);
    scored.truncate(k);
    scored
}

/// Reject a spec that differs from the one the store was built with
pub(crate) fn check_spec(stored: Option<&EmbeddingSpec>, requested: &EmbeddingSpec) -> Result<()> {
    match stored {
        Some(stored) if stored != requested => Err(QaError::EmbeddingMismatch {
            expected: stored.to_string(),
            actual: requested.to_string(),
        }),
        _ => Ok(()),
    }
}
