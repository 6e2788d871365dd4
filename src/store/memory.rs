//! In-process document store with brute-force cosine search
//!
//! Optionally snapshots to a JSON file after every write so an ingest run
//! and later question sessions can share the same rows.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::debug;

use super::types::{Chunk, EmbeddingSpec, ScoredChunk};
use super::{check_spec, cosine_similarity, rank, DocumentStore};
use crate::errors::{QaError, Result};

/// On-disk snapshot layout
#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    spec: Option<EmbeddingSpec>,
    chunks: Vec<Chunk>,
}

pub struct MemoryStore {
    state: RwLock<Snapshot>,
    path: Option<PathBuf>,
}

impl MemoryStore {
    /// Empty store with no persistence
    pub fn new() -> Self {
        Self {
            state: RwLock::new(Snapshot::default()),
            path: None,
        }
    }

    /// Open a store backed by `path`, loading the snapshot if it exists
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let snapshot = if path.exists() {
            let json = fs::read_to_string(&path)?;
            let snapshot: Snapshot = serde_json::from_str(&json).map_err(|e| {
                QaError::StoreError(format!("Corrupt store snapshot {}: {}", path.display(), e))
            })?;
            debug!(path = %path.display(), chunks = snapshot.chunks.len(), "loaded store snapshot");
            snapshot
        } else {
            Snapshot::default()
        };

        Ok(Self {
            state: RwLock::new(snapshot),
            path: Some(path),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn persist(&self, snapshot: &Snapshot) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        // write-then-rename
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec(snapshot)?)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn append(&self, spec: &EmbeddingSpec, chunks: Vec<Chunk>) -> Result<usize> {
        if let Some(bad) = chunks.iter().find(|c| c.embedding.len() != spec.dimension) {
            return Err(QaError::EmbeddingMismatch {
                expected: spec.to_string(),
                actual: format!("{}/{}", spec.model, bad.embedding.len()),
            });
        }

        let mut state = self.state.write().await;
        check_spec(state.spec.as_ref(), spec)?;

        let written = chunks.len();
        if written == 0 {
            return Ok(0);
        }

        // rows are keyed by (identifier, index); a rewrite replaces the old row
        let keys: HashSet<(&str, usize)> = chunks
            .iter()
            .map(|c| (c.source_identifier.as_str(), c.chunk_index))
            .collect();
        let mut next = Snapshot {
            spec: Some(state.spec.clone().unwrap_or_else(|| spec.clone())),
            chunks: state
                .chunks
                .iter()
                .filter(|c| !keys.contains(&(c.source_identifier.as_str(), c.chunk_index)))
                .cloned()
                .collect(),
        };
        next.chunks.extend(chunks);

        self.persist(&next)?;
        *state = next;
        Ok(written)
    }

    async fn search(
        &self,
        spec: &EmbeddingSpec,
        embedding: &[f32],
        k: usize,
    ) -> Result<Vec<ScoredChunk>> {
        let state = self.state.read().await;
        if state.chunks.is_empty() {
            return Ok(Vec::new());
        }
        check_spec(state.spec.as_ref(), spec)?;

        let scored = state
            .chunks
            .iter()
            .map(|chunk| ScoredChunk::from_chunk(chunk, cosine_similarity(embedding, &chunk.embedding)))
            .collect();

        Ok(rank(scored, k))
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.state.read().await.chunks.len() as u64)
    }

    async fn remove_document(&self, source_identifier: &str) -> Result<u64> {
        let mut state = self.state.write().await;
        let kept: Vec<Chunk> = state
            .chunks
            .iter()
            .filter(|c| c.source_identifier != source_identifier)
            .cloned()
            .collect();
        let removed = (state.chunks.len() - kept.len()) as u64;
        if removed == 0 {
            return Ok(0);
        }

        let next = Snapshot {
            spec: if kept.is_empty() { None } else { state.spec.clone() },
            chunks: kept,
        };
        self.persist(&next)?;
        *state = next;
        Ok(removed)
    }

    async fn clear(&self) -> Result<()> {
        let mut state = self.state.write().await;
        let next = Snapshot::default();
        self.persist(&next)?;
        *state = next;
        Ok(())
    }

    async fn embedding_spec(&self) -> Result<Option<EmbeddingSpec>> {
        Ok(self.state.read().await.spec.clone())
    }
}
