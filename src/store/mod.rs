//! Vector-store abstraction.
//!
//! The [`VectorStore`] trait is the only way the rest of the crate touches
//! the shared index: add texts with metadata under caller-chosen IDs, and
//! run a nearest-neighbour search for a query string. Ranking is entirely
//! the backend's business.
//!
//! | Backend | Module | Use |
//! |---------|--------|-----|
//! | [`InMemoryVectorStore`] | [`memory`] | tests, local runs |
//! | [`PineconeVectorStore`] | [`pinecone`] | hosted index |
//!
//! Implementations must be `Send + Sync` to be shared across request handlers.

pub mod memory;
pub mod pinecone;

pub use memory::InMemoryVectorStore;
pub use pinecone::PineconeVectorStore;

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use crate::config::Config;
use crate::embedding::create_embedder;
use crate::error::StoreError;

/// One ranked result of a similarity search.
#[derive(Debug, Clone)]
pub struct SearchHit {
    /// Fragment ID.
    pub id: String,
    /// Fragment text.
    pub text: String,
    /// Metadata stored with the fragment.
    pub metadata: serde_json::Value,
    /// Backend similarity score (higher is more similar).
    pub score: f32,
}

/// Abstract vector index.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Store `texts[i]` with `metadatas[i]` under `ids[i]`.
    ///
    /// Writing an existing ID replaces the previous entry.
    async fn add_texts(
        &self,
        texts: &[String],
        metadatas: &[serde_json::Value],
        ids: &[String],
    ) -> Result<(), StoreError>;

    /// Return up to `k` fragments nearest to `query`, most relevant first.
    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>, StoreError>;
}

/// Check that the three parallel batches have the same length.
pub(crate) fn check_batch(
    texts: &[String],
    metadatas: &[serde_json::Value],
    ids: &[String],
) -> Result<(), StoreError> {
    if texts.len() != metadatas.len() || texts.len() != ids.len() {
        return Err(StoreError::MismatchedBatch {
            texts: texts.len(),
            metadatas: metadatas.len(),
            ids: ids.len(),
        });
    }
    Ok(())
}

/// Build the vector store named by `[vector_store].provider`.
pub fn create_store(config: &Config) -> Result<Arc<dyn VectorStore>> {
    let embedder = create_embedder(&config.embedding)?;
    info!(
        provider = %config.vector_store.provider,
        embedder = %embedder.model_name(),
        dims = embedder.dims(),
        "vector store configured"
    );
    match config.vector_store.provider.as_str() {
        "memory" => Ok(Arc::new(InMemoryVectorStore::new(embedder))),
        "pinecone" => Ok(Arc::new(PineconeVectorStore::from_config(
            &config.vector_store,
            embedder,
        )?)),
        other => anyhow::bail!("Unknown vector store provider: {}", other),
    }
}
