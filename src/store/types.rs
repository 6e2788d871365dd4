use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// One stored piece of a document with its embedding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub source_identifier: String,
    pub chunk_index: usize,
    pub text: String,
    pub embedding: Vec<f32>,
}

/// A stored chunk paired with its similarity to a query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub source_identifier: String,
    pub chunk_index: usize,
    pub text: String,
    pub score: f32,
}

impl ScoredChunk {
    pub fn from_chunk(chunk: &Chunk, score: f32) -> Self {
        Self {
            source_identifier: chunk.source_identifier.clone(),
            chunk_index: chunk.chunk_index,
            text: chunk.text.clone(),
            score,
        }
    }

    /// Descending score, then identifier and chunk index ascending
    pub fn rank_order(a: &ScoredChunk, b: &ScoredChunk) -> Ordering {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.source_identifier.cmp(&b.source_identifier))
            .then_with(|| a.chunk_index.cmp(&b.chunk_index))
    }
}

/// Embedding model a store was built with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddingSpec {
    pub model: String,
    pub dimension: usize,
}

impl EmbeddingSpec {
    pub fn new(model: impl Into<String>, dimension: usize) -> Self {
        Self {
            model: model.into(),
            dimension,
        }
    }
}

impl fmt::Display for EmbeddingSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.model, self.dimension)
    }
}
