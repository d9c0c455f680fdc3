//! Pinecone REST client.
//!
//! Vectors are computed locally with the configured [`Embedder`] and
//! upserted to the index data-plane host. Pinecone metadata is flat, so the
//! fragment text travels in the metadata under `text` and is split back out
//! on query.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use crate::config::VectorStoreConfig;
use crate::embedding::{embed_query, Embedder};
use crate::error::StoreError;

use super::{check_batch, SearchHit, VectorStore};

const TEXT_KEY: &str = "text";

pub struct PineconeVectorStore {
    client: reqwest::Client,
    host: String,
    namespace: Option<String>,
    api_key: String,
    embedder: Arc<dyn Embedder>,
}

impl PineconeVectorStore {
    /// Build a client from `[vector_store]`. Requires `PINECONE_API_KEY`.
    pub fn from_config(config: &VectorStoreConfig, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let host = config
            .host
            .clone()
            .context("vector_store.host required for Pinecone provider")?;
        let api_key = std::env::var("PINECONE_API_KEY")
            .context("PINECONE_API_KEY environment variable not set")?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            host: normalize_host(&host),
            namespace: config.namespace.clone(),
            api_key,
            embedder,
        })
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value, StoreError> {
        let url = format!("{}{}", self.host, path);
        let response = self
            .client
            .post(&url)
            .header("Api-Key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(StoreError::Backend(format!("Pinecone {} {}: {}", path, status, text)));
        }
        response
            .json()
            .await
            .map_err(|e| StoreError::Backend(format!("invalid Pinecone response: {}", e)))
    }
}

fn normalize_host(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}

/// Merge the fragment text into its metadata object.
fn metadata_with_text(metadata: &Value, text: &str) -> Value {
    let mut merged = match metadata {
        Value::Object(map) => map.clone(),
        _ => serde_json::Map::new(),
    };
    merged.insert(TEXT_KEY.to_string(), Value::String(text.to_string()));
    Value::Object(merged)
}

/// Build the upsert payload records, one per fragment.
fn upsert_records(
    texts: &[String],
    metadatas: &[Value],
    ids: &[String],
    vectors: Vec<Vec<f32>>,
) -> Result<Vec<Value>, StoreError> {
    if vectors.len() != texts.len() {
        return Err(StoreError::Embedding(format!(
            "expected {} vectors, got {}",
            texts.len(),
            vectors.len()
        )));
    }

    Ok(ids
        .iter()
        .zip(vectors)
        .zip(texts.iter().zip(metadatas))
        .map(|((id, values), (text, metadata))| {
            json!({
                "id": id,
                "values": values,
                "metadata": metadata_with_text(metadata, text),
            })
        })
        .collect())
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Debug, Deserialize)]
struct QueryMatch {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Option<Value>,
}

impl From<QueryMatch> for SearchHit {
    fn from(m: QueryMatch) -> Self {
        let mut metadata = m.metadata.unwrap_or_else(|| json!({}));
        let text = metadata
            .as_object_mut()
            .and_then(|map| map.remove(TEXT_KEY))
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();
        SearchHit {
            id: m.id,
            text,
            metadata,
            score: m.score,
        }
    }
}

#[async_trait]
impl VectorStore for PineconeVectorStore {
    async fn add_texts(
        &self,
        texts: &[String],
        metadatas: &[Value],
        ids: &[String],
    ) -> Result<(), StoreError> {
        check_batch(texts, metadatas, ids)?;
        if texts.is_empty() {
            return Ok(());
        }

        let vectors = self
            .embedder
            .embed(texts)
            .await
            .map_err(|e| StoreError::Embedding(e.to_string()))?;

        let records = upsert_records(texts, metadatas, ids, vectors)?;

        let mut body = json!({ "vectors": records });
        if let Some(ns) = &self.namespace {
            body["namespace"] = json!(ns);
        }
        self.post("/vectors/upsert", &body).await?;
        Ok(())
    }

    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>, StoreError> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let vector = embed_query(self.embedder.as_ref(), query)
            .await
            .map_err(|e| StoreError::Embedding(e.to_string()))?;

        let mut body = json!({
            "vector": vector,
            "topK": k,
            "includeMetadata": true,
        });
        if let Some(ns) = &self.namespace {
            body["namespace"] = json!(ns);
        }

        let json = self.post("/query", &body).await?;
        let response: QueryResponse = serde_json::from_value(json)
            .map_err(|e| StoreError::Backend(format!("invalid Pinecone query response: {}", e)))?;
        Ok(response.matches.into_iter().map(SearchHit::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_host() {
        assert_eq!(
            normalize_host("tickets-abc.svc.pinecone.io/"),
            "https://tickets-abc.svc.pinecone.io"
        );
        assert_eq!(normalize_host("http://localhost:5080"), "http://localhost:5080");
    }

    #[test]
    fn test_metadata_carries_text() {
        let meta = metadata_with_text(&json!({"ticketId": "T-1"}), "slow login");
        assert_eq!(meta["ticketId"], "T-1");
        assert_eq!(meta["text"], "slow login");
    }

    #[test]
    fn test_upsert_records_shape() {
        let texts = vec!["slow login".to_string()];
        let metas = vec![json!({"ticketId": "T-1"})];
        let ids = vec!["T-1_0".to_string()];
        let records = upsert_records(&texts, &metas, &ids, vec![vec![0.5, -0.5]]).unwrap();
        assert_eq!(records[0]["id"], "T-1_0");
        assert_eq!(records[0]["values"], json!([0.5, -0.5]));
        assert_eq!(records[0]["metadata"]["text"], "slow login");
    }

    #[test]
    fn test_upsert_records_rejects_missing_vectors() {
        let texts = vec!["a".to_string(), "b".to_string()];
        let metas = vec![json!({}), json!({})];
        let ids = vec!["T_0".to_string(), "T_1".to_string()];
        let err = upsert_records(&texts, &metas, &ids, vec![vec![1.0]]).unwrap_err();
        assert!(matches!(err, StoreError::Embedding(ref m) if m == "expected 2 vectors, got 1"));
    }

    #[test]
    fn test_match_splits_text_from_metadata() {
        let raw = json!({
            "matches": [
                { "id": "T-1_0", "score": 0.82, "metadata": { "ticketId": "T-1", "text": "slow login" } },
                { "id": "T-2_0", "score": 0.41 }
            ]
        });
        let response: QueryResponse = serde_json::from_value(raw).unwrap();
        let hits: Vec<SearchHit> = response.matches.into_iter().map(SearchHit::from).collect();
        assert_eq!(hits[0].text, "slow login");
        assert!(hits[0].metadata.get("text").is_none());
        assert_eq!(hits[0].metadata["ticketId"], "T-1");
        assert_eq!(hits[1].text, "");
    }
}
