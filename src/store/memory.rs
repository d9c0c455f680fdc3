//! In-memory [`VectorStore`] implementation for tests and local runs.
//!
//! Entries live in a `Vec` behind `std::sync::RwLock`. Search is brute-force
//! cosine similarity over every stored vector; entries with a non-positive
//! similarity are not considered matches.

use async_trait::async_trait;
use std::sync::{Arc, RwLock};

use crate::embedding::{cosine_similarity, embed_query, Embedder};
use crate::error::StoreError;

use super::{check_batch, SearchHit, VectorStore};

struct StoredEntry {
    id: String,
    text: String,
    metadata: serde_json::Value,
    vector: Vec<f32>,
}

/// In-memory store, keyed by fragment ID.
pub struct InMemoryVectorStore {
    embedder: Arc<dyn Embedder>,
    entries: RwLock<Vec<StoredEntry>>,
}

impl InMemoryVectorStore {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Number of stored fragments.
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// IDs of all stored fragments, in insertion order.
    pub fn ids(&self) -> Vec<String> {
        self.entries
            .read()
            .map(|entries| entries.iter().map(|e| e.id.clone()).collect())
            .unwrap_or_default()
    }

    /// Text stored under `id`, if any.
    pub fn text_of(&self, id: &str) -> Option<String> {
        self.entries
            .read()
            .ok()?
            .iter()
            .find(|e| e.id == id)
            .map(|e| e.text.clone())
    }
}

fn poisoned() -> StoreError {
    StoreError::Backend("in-memory index lock poisoned".to_string())
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn add_texts(
        &self,
        texts: &[String],
        metadatas: &[serde_json::Value],
        ids: &[String],
    ) -> Result<(), StoreError> {
        check_batch(texts, metadatas, ids)?;

        let vectors = self
            .embedder
            .embed(texts)
            .await
            .map_err(|e| StoreError::Embedding(e.to_string()))?;
        if vectors.len() != texts.len() {
            return Err(StoreError::Embedding(format!(
                "expected {} vectors, got {}",
                texts.len(),
                vectors.len()
            )));
        }

        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        for (((text, metadata), id), vector) in texts.iter().zip(metadatas).zip(ids).zip(vectors) {
            let entry = StoredEntry {
                id: id.clone(),
                text: text.clone(),
                metadata: metadata.clone(),
                vector,
            };
            match entries.iter_mut().find(|e| e.id == *id) {
                Some(existing) => *existing = entry,
                None => entries.push(entry),
            }
        }
        Ok(())
    }

    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>, StoreError> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let query_vec = embed_query(self.embedder.as_ref(), query)
            .await
            .map_err(|e| StoreError::Embedding(e.to_string()))?;

        let entries = self.entries.read().map_err(|_| poisoned())?;
        let mut hits: Vec<SearchHit> = entries
            .iter()
            .filter_map(|e| {
                let score = cosine_similarity(&query_vec, &e.vector);
                (score > 0.0).then(|| SearchHit {
                    id: e.id.clone(),
                    text: e.text.clone(),
                    metadata: e.metadata.clone(),
                    score,
                })
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(k);
        Ok(hits)
    }
}
