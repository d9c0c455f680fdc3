//! Ticket augmentation: retrieval plus one summarizing model call.
//!
//! The model is asked for a JSON object with `resumen` (summary) and
//! `contactos` (contacts). Its reply goes through
//! [`parse_structured_reply`]; the contact list it returns is ignored and
//! always rebuilt from the retrieved tickets' owners.

use std::sync::Arc;
use tracing::{info, warn};

use crate::llm::ChatModel;
use crate::models::{AugmentationResult, Ticket};
use crate::reply::{parse_structured_reply, SummarySource};
use crate::retrieval::RetrievalService;

pub const SUMMARY_KEY: &str = "resumen";
pub const CONTACTS_KEY: &str = "contactos";

const SYSTEM_PROMPT: &str = r#"You are an assistant that helps IT support staff understand a new support ticket.
You are given the incoming ticket and a list of older, similar tickets.
Write a natural-language summary of the most similar problems found in the older tickets, based on their description field.
Also list the people who can help resolve the incoming ticket, using the owner field of the older tickets.
Answer ONLY with JSON in this exact format, with no text outside the JSON:
```json
{
    "resumen": "<your summary>",
    "contactos": ["<contact>", "..."]
}
```"#;

pub struct AugmentationService {
    retrieval: RetrievalService,
    model: Arc<dyn ChatModel>,
    temperature: f32,
}

impl AugmentationService {
    pub fn new(retrieval: RetrievalService, model: Arc<dyn ChatModel>, temperature: f32) -> Self {
        Self {
            retrieval,
            model,
            temperature,
        }
    }

    /// Summarize tickets similar to `ticket` and list who handled them.
    ///
    /// Never fails: no matches yield [`AugmentationResult::no_similar_tickets`],
    /// a model failure yields an error summary with the retrieved contacts.
    pub async fn augment(&self, ticket: &Ticket) -> AugmentationResult {
        let related = self.retrieval.retrieve_relevant(ticket).await;
        if related.is_empty() {
            return AugmentationResult::no_similar_tickets();
        }
        let contacts = unique_owners(&related);

        let user = build_user_prompt(ticket, &related);
        let raw = match self
            .model
            .complete(SYSTEM_PROMPT, &user, self.temperature, None)
            .await
        {
            Ok(raw) => raw,
            Err(e) => {
                warn!(ticket_id = %ticket.ticket_id, error = %e, "augmentation model call failed");
                return AugmentationResult {
                    summary: format!("Error generating summary: {}", e),
                    contacts,
                };
            }
        };

        let reply = parse_structured_reply(&raw, SUMMARY_KEY, CONTACTS_KEY);
        if reply.source == SummarySource::RawText {
            warn!(ticket_id = %ticket.ticket_id, "model reply was not JSON, using raw text");
        }
        info!(
            ticket_id = %ticket.ticket_id,
            related = related.len(),
            source = ?reply.source,
            "ticket augmented"
        );

        AugmentationResult {
            summary: reply.summary,
            contacts,
        }
    }
}

/// Owners of `tickets`, deduplicated in first-seen order.
pub fn unique_owners(tickets: &[Ticket]) -> Vec<String> {
    let mut owners: Vec<String> = Vec::new();
    for t in tickets {
        if !owners.contains(&t.owner) {
            owners.push(t.owner.clone());
        }
    }
    owners
}

fn build_user_prompt(ticket: &Ticket, related: &[Ticket]) -> String {
    let render = |t: &Ticket| serde_json::to_string_pretty(t).unwrap_or_else(|_| format!("{:?}", t));
    let similar: Vec<String> = related.iter().map(render).collect();
    format!(
        "Incoming ticket:\n{}\n\nSimilar tickets:\n{}",
        render(ticket),
        similar.join("\n")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::ChunkParams;
    use crate::embedding::HashEmbedder;
    use crate::llm::fake::ScriptedChat;
    use crate::repository::tests::ticket;
    use crate::repository::TicketRepository;
    use crate::store::InMemoryVectorStore;

    async fn seeded_retrieval() -> RetrievalService {
        let store = Arc::new(InMemoryVectorStore::new(Arc::new(HashEmbedder::new(256))));
        let repo = TicketRepository::new(store, ChunkParams::default(), 5);
        for (id, owner) in [("NET-1", "Marta - Sales"), ("NET-2", "Juan - IT"), ("NET-3", "Marta - Sales")] {
            repo.store(&ticket(id, owner, "VPN connection drops every few minutes"))
                .await
                .unwrap();
        }
        RetrievalService::new(repo, 5)
    }

    fn query() -> Ticket {
        ticket("NEW-1", "Carla - HR", "My VPN connection drops constantly")
    }

    #[tokio::test]
    async fn test_no_matches_returns_sentinel_without_model_call() {
        let store = Arc::new(InMemoryVectorStore::new(Arc::new(HashEmbedder::new(64))));
        let retrieval = RetrievalService::new(TicketRepository::new(store, ChunkParams::default(), 5), 5);
        let model = Arc::new(ScriptedChat::replying("unused"));
        let svc = AugmentationService::new(retrieval, model.clone(), 0.7);

        let result = svc.augment(&query()).await;
        assert_eq!(result, AugmentationResult::no_similar_tickets());
        assert_eq!(model.request_count(), 0);
    }

    #[tokio::test]
    async fn test_fenced_json_summary_with_retrieval_contacts() {
        let model = Arc::new(ScriptedChat::replying(
            "```json\n{\"resumen\": \"X\", \"contactos\": [\"a\"]}\n```",
        ));
        let svc = AugmentationService::new(seeded_retrieval().await, model.clone(), 0.7);

        let result = svc.augment(&query()).await;
        assert_eq!(result.summary, "X");
        assert_eq!(result.contacts, vec!["Marta - Sales", "Juan - IT"]);

        let requests = model.requests.lock().unwrap();
        let user = requests[0].0[1].content.clone().unwrap();
        assert!(user.contains("NEW-1"));
        assert!(user.contains("NET-2"));
        assert_eq!(requests[0].2.temperature, 0.7);
    }

    #[tokio::test]
    async fn test_non_json_reply_is_summary() {
        let model = Arc::new(ScriptedChat::replying("Restart the VPN client."));
        let svc = AugmentationService::new(seeded_retrieval().await, model, 0.7);

        let result = svc.augment(&query()).await;
        assert_eq!(result.summary, "Restart the VPN client.");
        assert_eq!(result.contacts.len(), 2);
    }

    #[tokio::test]
    async fn test_quoted_key_reply() {
        let model = Arc::new(ScriptedChat::replying("```json\n{\"'resumen'\": \"Y\"}\n```"));
        let svc = AugmentationService::new(seeded_retrieval().await, model, 0.7);
        assert_eq!(svc.augment(&query()).await.summary, "Y");
    }

    #[tokio::test]
    async fn test_model_failure_degrades() {
        let model = Arc::new(ScriptedChat::failing("connection reset"));
        let svc = AugmentationService::new(seeded_retrieval().await, model, 0.7);

        let result = svc.augment(&query()).await;
        assert!(result.summary.starts_with("Error generating summary"));
        assert!(result.summary.contains("connection reset"));
        assert_eq!(result.contacts.len(), 2);
    }

    #[test]
    fn test_unique_owners_keeps_rank_order() {
        let tickets = vec![
            ticket("1", "B", "xxxxx"),
            ticket("2", "A", "xxxxx"),
            ticket("3", "B", "xxxxx"),
        ];
        assert_eq!(unique_owners(&tickets), vec!["B", "A"]);
    }
}
