//! Qdrant-backed document store
//!
//! One collection with cosine distance. Point IDs are UUIDv5 of
//! `identifier#index` so re-ingesting a document overwrites its rows.

use async_trait::async_trait;
use qdrant_client::{
    client::QdrantClient,
    qdrant::{
        points_selector::PointsSelectorOneOf, vectors_config::Config as VectorConfig,
        with_payload_selector::SelectorOptions, Condition, CountPoints, CreateCollection, Distance,
        Filter, PointStruct, PointsSelector, ScrollPoints, SearchPoints, Value as QdrantValue,
        VectorParams, VectorsConfig, WithPayloadSelector,
    },
};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use super::types::{Chunk, EmbeddingSpec, ScoredChunk};
use super::{check_spec, rank, DocumentStore};
use crate::errors::{QaError, Result};

const SERVICE: &str = "qdrant";

/// Extra rows fetched past `k` so ties at the cut can be re-ranked
const TIE_MARGIN: u64 = 8;

pub struct QdrantStore {
    client: QdrantClient,
    collection: String,
    spec: RwLock<Option<EmbeddingSpec>>,
}

impl QdrantStore {
    pub fn connect(url: &str, collection: &str) -> Result<Self> {
        let client = QdrantClient::from_url(url)
            .build()
            .map_err(|e| QaError::unavailable(SERVICE, e))?;

        Ok(Self {
            client,
            collection: collection.to_string(),
            spec: RwLock::new(None),
        })
    }

    pub fn point_id(source_identifier: &str, chunk_index: usize) -> String {
        let key = format!("{}#{}", source_identifier, chunk_index);
        Uuid::new_v5(&Uuid::NAMESPACE_URL, key.as_bytes()).to_string()
    }

    async fn collection_exists(&self) -> Result<bool> {
        let collections = self
            .client
            .list_collections()
            .await
            .map_err(|e| QaError::unavailable(SERVICE, e))?;

        Ok(collections
            .collections
            .iter()
            .any(|c| c.name == self.collection))
    }

    async fn ensure_collection(&self, dimension: usize) -> Result<()> {
        if self.collection_exists().await? {
            return Ok(());
        }

        info!(collection = %self.collection, dimension, "creating qdrant collection");
        self.client
            .create_collection(&CreateCollection {
                collection_name: self.collection.clone(),
                vectors_config: Some(VectorsConfig {
                    config: Some(VectorConfig::Params(VectorParams {
                        size: dimension as u64,
                        distance: Distance::Cosine.into(),
                        ..Default::default()
                    })),
                }),
                ..Default::default()
            })
            .await
            .map_err(|e| QaError::unavailable(SERVICE, e))?;

        Ok(())
    }

    /// Read the embedding spec from any stored point's payload
    async fn load_spec(&self) -> Result<Option<EmbeddingSpec>> {
        if let Some(spec) = self.spec.read().await.clone() {
            return Ok(Some(spec));
        }
        if !self.collection_exists().await? {
            return Ok(None);
        }

        let response = self
            .client
            .scroll(&ScrollPoints {
                collection_name: self.collection.clone(),
                limit: Some(1),
                with_payload: Some(WithPayloadSelector {
                    selector_options: Some(SelectorOptions::Enable(true)),
                }),
                ..Default::default()
            })
            .await
            .map_err(|e| QaError::unavailable(SERVICE, e))?;

        let spec = response.result.first().and_then(|point| {
            let model = point.payload.get("model").and_then(qdrant_string)?;
            let dimension = point.payload.get("dimension").and_then(qdrant_integer)?;
            Some(EmbeddingSpec::new(model, dimension as usize))
        });

        if let Some(spec) = &spec {
            *self.spec.write().await = Some(spec.clone());
        }
        Ok(spec)
    }

    async fn search_limit(&self, embedding: &[f32], limit: u64) -> Result<Vec<ScoredChunk>> {
        let response = self
            .client
            .search_points(&SearchPoints {
                collection_name: self.collection.clone(),
                vector: embedding.to_vec(),
                limit,
                with_payload: Some(WithPayloadSelector {
                    selector_options: Some(SelectorOptions::Enable(true)),
                }),
                ..Default::default()
            })
            .await
            .map_err(|e| QaError::unavailable(SERVICE, e))?;

        let scored: Vec<ScoredChunk> = response
            .result
            .into_iter()
            .map(|point| ScoredChunk {
                source_identifier: point
                    .payload
                    .get("source_identifier")
                    .and_then(qdrant_string)
                    .unwrap_or_default(),
                chunk_index: point
                    .payload
                    .get("chunk_index")
                    .and_then(qdrant_integer)
                    .unwrap_or_default() as usize,
                text: point
                    .payload
                    .get("text")
                    .and_then(qdrant_string)
                    .unwrap_or_default(),
                score: point.score,
            })
            .collect();

        Ok(scored)
    }

    fn document_filter(source_identifier: &str) -> Filter {
        Filter::must([Condition::matches(
            "source_identifier",
            source_identifier.to_string(),
        )])
    }
}

#[async_trait]
impl DocumentStore for QdrantStore {
    async fn append(&self, spec: &EmbeddingSpec, chunks: Vec<Chunk>) -> Result<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }
        check_spec(self.load_spec().await?.as_ref(), spec)?;
        self.ensure_collection(spec.dimension).await?;

        let points: Vec<PointStruct> = chunks
            .into_iter()
            .map(|chunk| {
                let mut payload: HashMap<String, QdrantValue> = HashMap::new();
                payload.insert("text".to_string(), QdrantValue::from(chunk.text));
                payload.insert(
                    "source_identifier".to_string(),
                    QdrantValue::from(chunk.source_identifier.clone()),
                );
                payload.insert(
                    "chunk_index".to_string(),
                    QdrantValue::from(chunk.chunk_index as i64),
                );
                payload.insert("model".to_string(), QdrantValue::from(spec.model.clone()));
                payload.insert(
                    "dimension".to_string(),
                    QdrantValue::from(spec.dimension as i64),
                );
                PointStruct::new(
                    Self::point_id(&chunk.source_identifier, chunk.chunk_index),
                    chunk.embedding,
                    payload,
                )
            })
            .collect();

        let written = points.len();
        self.client
            .upsert_points_blocking(self.collection.as_str(), None, points, None)
            .await
            .map_err(|e| QaError::unavailable(SERVICE, e))?;

        *self.spec.write().await = Some(spec.clone());
        debug!(collection = %self.collection, written, "upserted chunks");
        Ok(written)
    }

    async fn search(
        &self,
        spec: &EmbeddingSpec,
        embedding: &[f32],
        k: usize,
    ) -> Result<Vec<ScoredChunk>> {
        let stored = self.load_spec().await?;
        if stored.is_none() {
            return Ok(Vec::new());
        }
        check_spec(stored.as_ref(), spec)?;

        // Qdrant cuts at `limit` by score alone; widen until the k-th score is
        // strictly above the last row fetched
        let mut limit = k as u64 + TIE_MARGIN;
        loop {
            let ranked = rank(self.search_limit(embedding, limit).await?, usize::MAX);
            if !tie_crosses_limit(&ranked, k, limit) {
                return Ok(rank(ranked, k));
            }
            limit = limit.saturating_mul(2);
        }
    }

    async fn count(&self) -> Result<u64> {
        if !self.collection_exists().await? {
            return Ok(0);
        }

        let info = self
            .client
            .collection_info(self.collection.as_str())
            .await
            .map_err(|e| QaError::unavailable(SERVICE, e))?;

        Ok(info.result.and_then(|r| r.points_count).unwrap_or(0))
    }

    async fn remove_document(&self, source_identifier: &str) -> Result<u64> {
        if !self.collection_exists().await? {
            return Ok(0);
        }

        let filter = Self::document_filter(source_identifier);
        let matching = self
            .client
            .count(&CountPoints {
                collection_name: self.collection.clone(),
                filter: Some(filter.clone()),
                exact: Some(true),
                ..Default::default()
            })
            .await
            .map_err(|e| QaError::unavailable(SERVICE, e))?
            .result
            .map(|r| r.count)
            .unwrap_or(0);
        if matching == 0 {
            return Ok(0);
        }

        let selector = PointsSelector {
            points_selector_one_of: Some(PointsSelectorOneOf::Filter(filter)),
        };
        self.client
            .delete_points_blocking(self.collection.as_str(), None, &selector, None)
            .await
            .map_err(|e| QaError::unavailable(SERVICE, e))?;

        if self.count().await? == 0 {
            *self.spec.write().await = None;
        }
        debug!(collection = %self.collection, source = source_identifier, removed = matching, "removed document");
        Ok(matching)
    }

    async fn clear(&self) -> Result<()> {
        if self.collection_exists().await? {
            self.client
                .delete_collection(self.collection.as_str())
                .await
                .map_err(|e| QaError::unavailable(SERVICE, e))?;
        }
        *self.spec.write().await = None;
        Ok(())
    }

    async fn embedding_spec(&self) -> Result<Option<EmbeddingSpec>> {
        self.load_spec().await
    }
}

/// Whether rows tied with the k-th may have been cut off by `limit`
fn tie_crosses_limit(ranked: &[ScoredChunk], k: usize, limit: u64) -> bool {
    if (ranked.len() as u64) < limit || ranked.len() <= k || k == 0 {
        return false;
    }
    match (ranked.get(k - 1), ranked.last()) {
        (Some(kth), Some(last)) => last.score >= kth.score,
        _ => false,
    }
}

fn qdrant_string(value: &QdrantValue) -> Option<String> {
    use qdrant_client::qdrant::value::Kind;
    match value.kind.as_ref()? {
        Kind::StringValue(s) => Some(s.clone()),
        _ => None,
    }
}

fn qdrant_integer(value: &QdrantValue) -> Option<i64> {
    use qdrant_client::qdrant::value::Kind;
    match value.kind.as_ref()? {
        Kind::IntegerValue(i) => Some(*i),
        _ => None,
    }
}
