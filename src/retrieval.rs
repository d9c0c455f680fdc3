//! Similar-ticket retrieval.
//!
//! The query is the incoming ticket's description; results are the full
//! tickets stored as metadata on the top-k fragments, in rank order. A ticket
//! split into several fragments may appear more than once, and the query
//! ticket itself is not filtered out.

use tracing::debug;

use crate::models::Ticket;
use crate::repository::{LookupOutcome, TicketRepository};

#[derive(Clone)]
pub struct RetrievalService {
    repository: TicketRepository,
    top_k: usize,
}

impl RetrievalService {
    pub fn new(repository: TicketRepository, top_k: usize) -> Self {
        Self { repository, top_k }
    }

    pub fn repository(&self) -> &TicketRepository {
        &self.repository
    }

    /// Run the lookup and keep the distinction between "nothing matched"
    /// and "the index failed".
    pub async fn lookup(&self, ticket: &Ticket) -> LookupOutcome {
        self.lookup_text(&ticket.description).await
    }

    /// Look up by free text.
    pub async fn lookup_text(&self, query: &str) -> LookupOutcome {
        if query.trim().is_empty() {
            debug!("blank retrieval query");
            return LookupOutcome::NoMatches;
        }
        self.repository.find_similar(query, self.top_k).await
    }

    /// Tickets similar to `ticket`, or an empty list when nothing matches
    /// or the index cannot be reached.
    pub async fn retrieve_relevant(&self, ticket: &Ticket) -> Vec<Ticket> {
        self.lookup(ticket).await.into_tickets()
    }
}
