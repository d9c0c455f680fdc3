//! Ticket repository adapter over a [`VectorStore`].
//!
//! Writes a ticket as one or more description fragments keyed
//! `{ticketId}_{index}`, each carrying the full ticket as metadata, and reads
//! tickets back from the metadata of the nearest fragments.
//!
//! Lookups distinguish "no matches" from "the index failed" through
//! [`LookupOutcome`]; callers that only need tickets collapse both to an
//! empty list with [`LookupOutcome::into_tickets`].

use std::sync::Arc;
use tracing::{debug, warn};

use crate::chunk::{split_text, ChunkParams};
use crate::error::StoreError;
use crate::models::{fragment_id, Ticket, TicketFragment};
use crate::store::VectorStore;

/// Result of a similar-ticket lookup.
#[derive(Debug)]
pub enum LookupOutcome {
    /// At least one fragment matched; tickets in relevance order.
    Found(Vec<Ticket>),
    /// The index answered but nothing matched.
    NoMatches,
    /// The index could not be queried.
    Failed(StoreError),
}

impl LookupOutcome {
    pub fn into_tickets(self) -> Vec<Ticket> {
        match self {
            LookupOutcome::Found(tickets) => tickets,
            LookupOutcome::NoMatches | LookupOutcome::Failed(_) => Vec::new(),
        }
    }
}

#[derive(Clone)]
pub struct TicketRepository {
    store: Arc<dyn VectorStore>,
    params: ChunkParams,
    min_description_chars: usize,
}

impl TicketRepository {
    pub fn new(store: Arc<dyn VectorStore>, params: ChunkParams, min_description_chars: usize) -> Self {
        Self {
            store,
            params,
            min_description_chars,
        }
    }

    pub fn min_description_chars(&self) -> usize {
        self.min_description_chars
    }

    /// Split a ticket's description into fragments with deterministic IDs.
    pub fn fragments(&self, ticket: &Ticket) -> Vec<TicketFragment> {
        let metadata = ticket.to_metadata();
        split_text(&ticket.description, &self.params)
            .into_iter()
            .enumerate()
            .map(|(index, text)| TicketFragment {
                id: fragment_id(&ticket.ticket_id, index),
                index,
                text,
                metadata: metadata.clone(),
            })
            .collect()
    }

    /// Store every fragment of `ticket`. Returns the number of fragments written.
    ///
    /// Descriptions shorter than the configured minimum are rejected before
    /// the index is touched.
    pub async fn store(&self, ticket: &Ticket) -> Result<usize, StoreError> {
        let len = ticket.description_len();
        if len < self.min_description_chars {
            return Err(StoreError::DescriptionTooShort {
                ticket_id: ticket.ticket_id.clone(),
                len,
                min: self.min_description_chars,
            });
        }

        let fragments = self.fragments(ticket);
        let mut texts = Vec::with_capacity(fragments.len());
        let mut metadatas = Vec::with_capacity(fragments.len());
        let mut ids = Vec::with_capacity(fragments.len());
        for fragment in fragments {
            texts.push(fragment.text);
            metadatas.push(fragment.metadata);
            ids.push(fragment.id);
        }

        self.store.add_texts(&texts, &metadatas, &ids).await?;
        debug!(ticket_id = %ticket.ticket_id, fragments = ids.len(), "stored ticket");
        Ok(ids.len())
    }

    /// Nearest-fragment search, reconstructing tickets from metadata.
    ///
    /// Hits whose metadata is not a ticket are skipped with a warning.
    pub async fn find_similar(&self, query: &str, k: usize) -> LookupOutcome {
        let hits = match self.store.similarity_search(query, k).await {
            Ok(hits) => hits,
            Err(e) => {
                warn!(error = %e, "similar-ticket lookup failed");
                return LookupOutcome::Failed(e);
            }
        };

        debug!(
            hits = hits.len(),
            best_score = hits.first().map(|h| h.score).unwrap_or(0.0),
            "similarity search finished"
        );

        let tickets: Vec<Ticket> = hits
            .into_iter()
            .filter_map(|hit| match Ticket::from_metadata(&hit.metadata) {
                Ok(ticket) => Some(ticket),
                Err(e) => {
                    warn!(fragment = %hit.id, error = %e, "stored metadata is not a ticket");
                    None
                }
            })
            .collect();

        if tickets.is_empty() {
            LookupOutcome::NoMatches
        } else {
            LookupOutcome::Found(tickets)
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::embedding::HashEmbedder;
    use crate::models::TicketPriority;
    use crate::store::{InMemoryVectorStore, SearchHit};
    use async_trait::async_trait;

    pub(crate) fn ticket(id: &str, owner: &str, description: &str) -> Ticket {
        Ticket {
            ticket_id: id.to_string(),
            creation_date: "2025-01-15".to_string(),
            priority: TicketPriority::Medium,
            owner: owner.to_string(),
            description: description.to_string(),
            impact: "Low".to_string(),
            actions: "None".to_string(),
        }
    }

    fn memory_repo() -> (TicketRepository, Arc<InMemoryVectorStore>) {
        let store = Arc::new(InMemoryVectorStore::new(Arc::new(HashEmbedder::new(256))));
        let repo = TicketRepository::new(store.clone(), ChunkParams::default(), 5);
        (repo, store)
    }

    struct BrokenStore;

    #[async_trait]
    impl VectorStore for BrokenStore {
        async fn add_texts(&self, _: &[String], _: &[serde_json::Value], _: &[String]) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
        async fn similarity_search(&self, _: &str, _: usize) -> Result<Vec<SearchHit>, StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
    }

    #[tokio::test]
    async fn test_short_description_rejected_without_writes() {
        let (repo, store) = memory_repo();
        let err = repo.store(&ticket("HW-1", "Ops", "abcd")).await.unwrap_err();
        assert!(matches!(err, StoreError::DescriptionTooShort { len: 4, min: 5, .. }));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_five_chars_is_enough() {
        let (repo, store) = memory_repo();
        assert_eq!(repo.store(&ticket("HW-2", "Ops", "abcde")).await.unwrap(), 1);
        assert_eq!(store.ids(), vec!["HW-2_0"]);
    }

    #[tokio::test]
    async fn test_long_description_fragment_ids() {
        let (repo, store) = memory_repo();
        let description = "The shared drive is unreachable from the accounting floor. ".repeat(10);
        let n = repo.store(&ticket("NET-9", "Ops", &description)).await.unwrap();
        assert!(n > 1);
        let expected: Vec<String> = (0..n).map(|i| format!("NET-9_{}", i)).collect();
        assert_eq!(store.ids(), expected);
    }

    #[tokio::test]
    async fn test_fragments_share_metadata() {
        let (repo, _) = memory_repo();
        let t = ticket("NET-3", "Ops", &"router reboot loop ".repeat(20));
        let fragments = repo.fragments(&t);
        assert!(fragments.len() > 1);
        for (i, f) in fragments.iter().enumerate() {
            assert_eq!(f.index, i);
            assert_eq!(f.metadata, t.to_metadata());
            assert!(f.text.chars().count() <= 200);
        }
    }

    #[tokio::test]
    async fn test_reingest_overwrites_same_ids() {
        let (repo, store) = memory_repo();
        repo.store(&ticket("SW-1", "Ops", "Excel crashes on open")).await.unwrap();
        repo.store(&ticket("SW-1", "Ops", "Excel crashes on save")).await.unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.text_of("SW-1_0").as_deref(), Some("Excel crashes on save"));
    }

    #[tokio::test]
    async fn test_find_similar_found_and_no_matches() {
        let (repo, _) = memory_repo();
        repo.store(&ticket("SW-1", "Ana - Finance", "Excel crashes when opening macros"))
            .await
            .unwrap();

        match repo.find_similar("excel macros crash", 5).await {
            LookupOutcome::Found(tickets) => assert_eq!(tickets[0].owner, "Ana - Finance"),
            other => panic!("expected matches, got {:?}", other),
        }
        assert!(matches!(
            repo.find_similar("...", 5).await,
            LookupOutcome::NoMatches
        ));
    }

    #[tokio::test]
    async fn test_find_similar_failure_is_distinct_but_empty() {
        let repo = TicketRepository::new(Arc::new(BrokenStore), ChunkParams::default(), 5);
        let outcome = repo.find_similar("printer", 5).await;
        assert!(matches!(outcome, LookupOutcome::Failed(StoreError::Unavailable(_))));
        assert!(outcome.into_tickets().is_empty());
    }
}
