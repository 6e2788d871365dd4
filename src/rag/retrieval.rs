// Retriever: embed the question, rank stored chunks by cosine similarity
use std::sync::Arc;
use tracing::debug;

use crate::embedding::Embedder;
use crate::errors::{QaError, Result};
use crate::store::{DocumentStore, ScoredChunk};

/// Read-only view over a store, queried through one embedder
#[derive(Clone)]
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn DocumentStore>,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn DocumentStore>) -> Self {
        Self { embedder, store }
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Top `k` chunks for `question`, highest score first.
    ///
    /// The question and `k` are validated before any service is called.
    /// An empty store yields an empty result.
    pub async fn retrieve(&self, question: &str, k: usize) -> Result<Vec<ScoredChunk>> {
        let question = validate_question(question)?;
        if k == 0 {
            return Err(QaError::InvalidTopK(k));
        }

        let embedding = self.embedder.embed(question).await?;
        let spec = self.embedder.spec_for(&embedding);
        let results = self.store.search(&spec, &embedding, k).await?;

        debug!(
            k,
            hits = results.len(),
            top_score = results.first().map(|c| c.score),
            "retrieved chunks"
        );
        Ok(results)
    }
}

/// Trimmed question, or malformed-question if nothing is left
pub fn validate_question(question: &str) -> Result<&str> {
    let trimmed = question.trim();
    if trimmed.is_empty() {
        return Err(QaError::MalformedQuestion(
            "question is empty or whitespace".to_string(),
        ));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Chunk, EmbeddingSpec, MemoryStore};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Returns a fixed vector and counts calls
    struct FixedEmbedder {
        vector: Vec<f32>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Embedder for FixedEmbedder {
        fn model(&self) -> &str {
            "fixed"
        }

        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.vector.clone())
        }
    }

    fn chunk(id: &str, embedding: Vec<f32>) -> Chunk {
        Chunk {
            source_identifier: id.to_string(),
            chunk_index: 0,
            text: format!("text of {}", id),
            embedding,
        }
    }

    async fn setup(chunks: Vec<Chunk>) -> (Retriever, Arc<FixedEmbedder>) {
        let store = Arc::new(MemoryStore::new());
        if !chunks.is_empty() {
            store
                .append(&EmbeddingSpec::new("fixed", 2), chunks)
                .await
                .unwrap();
        }
        let embedder = Arc::new(FixedEmbedder {
            vector: vec![1.0, 0.0],
            calls: AtomicUsize::new(0),
        });
        (Retriever::new(embedder.clone(), store), embedder)
    }

    #[tokio::test]
    async fn test_results_bounded_and_sorted() {
        let (retriever, _) = setup(vec![
            chunk("a", vec![0.0, 1.0]),
            chunk("b", vec![1.0, 0.0]),
            chunk("c", vec![1.0, 1.0]),
        ])
        .await;

        let results = retriever.retrieve("total?", 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].source_identifier, "b");
        assert_eq!(results[1].source_identifier, "c");
        assert!(results[0].score >= results[1].score);
    }

    #[tokio::test]
    async fn test_empty_store_returns_nothing() {
        let (retriever, embedder) = setup(Vec::new()).await;
        assert!(retriever.retrieve("anything", 3).await.unwrap().is_empty());
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_blank_question_makes_no_calls() {
        let (retriever, embedder) = setup(vec![chunk("a", vec![1.0, 0.0])]).await;

        for question in ["", "   ", "\n\t"] {
            assert!(matches!(
                retriever.retrieve(question, 3).await,
                Err(QaError::MalformedQuestion(_))
            ));
        }
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_zero_k_rejected() {
        let (retriever, embedder) = setup(Vec::new()).await;
        assert!(matches!(
            retriever.retrieve("q", 0).await,
            Err(QaError::InvalidTopK(0))
        ));
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_mismatched_store_is_rejected() {
        let store = Arc::new(MemoryStore::new());
        store
            .append(&EmbeddingSpec::new("other-model", 2), vec![chunk("a", vec![1.0, 0.0])])
            .await
            .unwrap();
        let embedder = Arc::new(FixedEmbedder {
            vector: vec![1.0, 0.0],
            calls: AtomicUsize::new(0),
        });

        let err = Retriever::new(embedder, store).retrieve("q", 1).await.unwrap_err();
        assert!(matches!(err, QaError::EmbeddingMismatch { .. }));
    }
}
