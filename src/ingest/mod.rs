//! Document ingestion: split text, embed each chunk, append to the store

pub mod chunker;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::embedding::Embedder;
use crate::errors::{QaError, Result};
use crate::store::{Chunk, DocumentStore};

pub use chunker::Chunker;

/// File extensions picked up when ingesting a directory
const TEXT_EXTENSIONS: [&str; 3] = ["txt", "md", "text"];

/// Per-document outcome of an ingest run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestedDocument {
    pub source_identifier: String,
    pub chunks: usize,
}

pub struct Ingestor {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn DocumentStore>,
    chunker: Chunker,
    batch_size: usize,
}

impl Ingestor {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn DocumentStore>,
        chunker: Chunker,
        batch_size: usize,
    ) -> Self {
        Self {
            embedder,
            store,
            chunker,
            batch_size: batch_size.max(1),
        }
    }

    /// Chunk, embed and store one document, replacing any earlier version;
    /// returns the number of chunks written
    pub async fn ingest_document(&self, source_identifier: &str, text: &str) -> Result<usize> {
        let source_identifier = source_identifier.trim();
        if source_identifier.is_empty() {
            return Err(QaError::IngestError("source identifier must not be empty".to_string()));
        }

        let pieces = self.chunker.split(text);
        if pieces.is_empty() {
            warn!(source = source_identifier, "document has no text, skipping");
            return Ok(0);
        }

        // a re-ingest replaces the document, including chunks past its new end
        let replaced = self.store.remove_document(source_identifier).await?;
        if replaced > 0 {
            debug!(source = source_identifier, replaced, "removed previous version");
        }

        let written = match self.write_chunks(source_identifier, &pieces).await {
            Ok(written) => written,
            Err(e) => {
                // no partial documents
                if let Err(cleanup) = self.store.remove_document(source_identifier).await {
                    warn!(source = source_identifier, error = %cleanup, "could not remove partial document");
                }
                return Err(e);
            }
        };

        info!(source = source_identifier, chunks = written, "ingested document");
        Ok(written)
    }

    async fn write_chunks(&self, source_identifier: &str, pieces: &[String]) -> Result<usize> {
        let mut written = 0;
        for (batch_number, batch) in pieces.chunks(self.batch_size).enumerate() {
            let embeddings = self.embedder.embed_batch(batch).await?;
            if embeddings.len() != batch.len() {
                return Err(QaError::unavailable(
                    "embedding",
                    format!("expected {} embeddings, got {}", batch.len(), embeddings.len()),
                ));
            }

            let Some(first) = embeddings.first() else {
                continue;
            };
            let spec = self.embedder.spec_for(first);

            let offset = batch_number * self.batch_size;
            let chunks: Vec<Chunk> = batch
                .iter()
                .zip(embeddings)
                .enumerate()
                .map(|(i, (text, embedding))| Chunk {
                    source_identifier: source_identifier.to_string(),
                    chunk_index: offset + i,
                    text: text.clone(),
                    embedding,
                })
                .collect();

            written += self.store.append(&spec, chunks).await?;
            debug!(source = source_identifier, batch = batch_number, written, "stored batch");
        }
        Ok(written)
    }

    /// Ingest one file, identified by its file name
    pub async fn ingest_path(&self, path: &Path) -> Result<IngestedDocument> {
        let source_identifier = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| QaError::IngestError(format!("no file name in {}", path.display())))?
            .to_string();

        let bytes = tokio::fs::read(path).await?;
        let text = String::from_utf8(bytes).map_err(|_| {
            QaError::IngestError(format!("{} is not valid UTF-8 text", path.display()))
        })?;

        let chunks = self.ingest_document(&source_identifier, &text).await?;
        Ok(IngestedDocument {
            source_identifier,
            chunks,
        })
    }

    /// Ingest files, and the text files directly inside any directories given
    pub async fn ingest_paths(&self, paths: &[PathBuf]) -> Result<Vec<IngestedDocument>> {
        let mut results = Vec::new();
        for file in collect_files(paths)? {
            results.push(self.ingest_path(&file).await?);
        }
        Ok(results)
    }
}

/// Expand directories one level, in name order
fn collect_files(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut entries: Vec<PathBuf> = std::fs::read_dir(path)?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.is_file() && has_text_extension(p))
                .collect();
            entries.sort();
            files.extend(entries);
        } else if path.is_file() {
            files.push(path.clone());
        } else {
            return Err(QaError::IngestError(format!("{} does not exist", path.display())));
        }
    }
    Ok(files)
}

fn has_text_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| TEXT_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{EmbeddingSpec, MemoryStore};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Embeds text as [length, vowel count]
    struct LengthEmbedder {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Embedder for LengthEmbedder {
        fn model(&self) -> &str {
            "length"
        }

        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let vowels = text.chars().filter(|c| "aeiou".contains(*c)).count();
            Ok(vec![text.len() as f32, vowels as f32 + 1.0])
        }
    }

    fn ingestor(batch_size: usize) -> (Ingestor, Arc<MemoryStore>, Arc<LengthEmbedder>) {
        let store = Arc::new(MemoryStore::new());
        let embedder = Arc::new(LengthEmbedder {
            calls: AtomicUsize::new(0),
        });
        let ingestor = Ingestor::new(
            embedder.clone(),
            store.clone(),
            Chunker::new(20, 0).unwrap(),
            batch_size,
        );
        (ingestor, store, embedder)
    }

    #[tokio::test]
    async fn test_ingest_document_writes_every_chunk() {
        let (ingestor, store, embedder) = ingestor(2);
        let written = ingestor
            .ingest_document("notes.txt", "one two three four five six seven eight nine ten")
            .await
            .unwrap();

        assert!(written > 2);
        assert_eq!(store.count().await.unwrap(), written as u64);
        assert_eq!(embedder.calls.load(Ordering::SeqCst), written);
        assert_eq!(
            store.embedding_spec().await.unwrap(),
            Some(EmbeddingSpec::new("length", 2))
        );
    }

    #[tokio::test]
    async fn test_chunk_indices_are_sequential_across_batches() {
        let (ingestor, store, _) = ingestor(2);
        let written = ingestor
            .ingest_document("notes.txt", "one two three four five six seven eight nine ten")
            .await
            .unwrap();

        let spec = EmbeddingSpec::new("length", 2);
        let mut hits = store.search(&spec, &[1.0, 1.0], written).await.unwrap();
        hits.sort_by_key(|c| c.chunk_index);
        let indices: Vec<usize> = hits.iter().map(|c| c.chunk_index).collect();
        assert_eq!(indices, (0..written).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_blank_document_is_skipped() {
        let (ingestor, store, embedder) = ingestor(4);
        assert_eq!(ingestor.ingest_document("blank.txt", "  \n ").await.unwrap(), 0);
        assert_eq!(store.count().await.unwrap(), 0);
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_identifier_rejected() {
        let (ingestor, _, _) = ingestor(4);
        assert!(matches!(
            ingestor.ingest_document(" ", "text").await,
            Err(QaError::IngestError(_))
        ));
    }

    #[tokio::test]
    async fn test_ingest_paths_uses_file_names() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("b.txt"), "second document").unwrap();
        std::fs::write(dir.path().join("a.md"), "first document").unwrap();
        std::fs::write(dir.path().join("image.png"), [0u8, 159, 146, 150]).unwrap();

        let (ingestor, _, _) = ingestor(4);
        let results = ingestor.ingest_paths(&[dir.path().to_path_buf()]).await.unwrap();

        let names: Vec<&str> = results.iter().map(|r| r.source_identifier.as_str()).collect();
        assert_eq!(names, vec!["a.md", "b.txt"]);
        assert!(results.iter().all(|r| r.chunks == 1));
    }

    #[tokio::test]
    async fn test_non_utf8_file_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scan.txt");
        std::fs::write(&path, [0xffu8, 0xfe, 0xfd]).unwrap();

        let (ingestor, _, _) = ingestor(4);
        assert!(matches!(
            ingestor.ingest_path(&path).await,
            Err(QaError::IngestError(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_path_rejected() {
        let (ingestor, _, _) = ingestor(4);
        let missing = PathBuf::from("/definitely/not/here.txt");
        assert!(ingestor.ingest_paths(&[missing]).await.is_err());
    }

    #[tokio::test]
    async fn test_reingest_replaces_document() {
        let (ingestor, store, _) = ingestor(2);
        let text = "one two three four five six seven eight nine ten";
        let first = ingestor.ingest_document("notes.txt", text).await.unwrap();
        let second = ingestor.ingest_document("notes.txt", text).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(store.count().await.unwrap(), first as u64);

        let shorter = ingestor.ingest_document("notes.txt", "one two").await.unwrap();
        assert_eq!(shorter, 1);
        assert_eq!(store.count().await.unwrap(), 1);
    }

    /// Fails every call after the first `budget`
    struct FlakyEmbedder {
        budget: AtomicUsize,
    }

    #[async_trait]
    impl Embedder for FlakyEmbedder {
        fn model(&self) -> &str {
            "length"
        }

        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            let left = self.budget.load(Ordering::SeqCst);
            if left == 0 {
                return Err(QaError::unavailable("embedding", "connection refused"));
            }
            self.budget.store(left - 1, Ordering::SeqCst);
            Ok(vec![text.len() as f32, 1.0])
        }
    }

    #[tokio::test]
    async fn test_failed_batch_leaves_no_partial_document() {
        let store = Arc::new(MemoryStore::new());
        let spec = EmbeddingSpec::new("length", 2);
        store
            .append(
                &spec,
                vec![Chunk {
                    source_identifier: "other.txt".to_string(),
                    chunk_index: 0,
                    text: "kept".to_string(),
                    embedding: vec![4.0, 1.0],
                }],
            )
            .await
            .unwrap();

        let ingestor = Ingestor::new(
            Arc::new(FlakyEmbedder {
                budget: AtomicUsize::new(2),
            }),
            store.clone(),
            Chunker::new(20, 0).unwrap(),
            2,
        );
        let result = ingestor
            .ingest_document("notes.txt", "one two three four five six seven eight nine ten")
            .await;

        assert!(matches!(result, Err(QaError::ServiceUnavailable { .. })));
        let rows = store.search(&spec, &[1.0, 1.0], 10).await.unwrap();
        let ids: Vec<&str> = rows.iter().map(|c| c.source_identifier.as_str()).collect();
        assert_eq!(ids, vec!["other.txt"]);
    }
}
