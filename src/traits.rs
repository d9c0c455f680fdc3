//! Agent tools.
//!
//! The resolution agent exposes [`Tool`]s to the model through a
//! [`ToolRegistry`]. Two tools are built in:
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                ToolRegistry                 │
//! │  ┌─────────────────────┐  ┌──────────────┐  │
//! │  │ get_similar_tickets │  │  search_web  │  │
//! │  │  HTTP or local      │  │  WebSearch   │  │
//! │  └─────────────────────┘  └──────────────┘  │
//! └──────────────────────┬──────────────────────┘
//!                        ▼
//!          ResolutionAgent::solve() tool loop
//! ```
//!
//! Tool output is always text for the model. Lookup failures are rendered
//! into that text rather than returned as errors, so the model can decide
//! what to do next.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use crate::llm::ToolSpec;
use crate::models::{Ticket, TicketPriority};
use crate::repository::LookupOutcome;
use crate::retrieval::RetrievalService;
use crate::websearch::WebSearch;

// ═══════════════════════════════════════════════════════════════════════
// Tool Trait
// ═══════════════════════════════════════════════════════════════════════

/// A function the model can call during a resolution session.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Function name advertised to the model (lowercase with underscores).
    fn name(&self) -> &str;

    /// One-line description; the model uses it to decide when to call.
    fn description(&self) -> &str;

    /// JSON Schema of the arguments object.
    fn parameters_schema(&self) -> Value;

    /// Run the tool. `params` is the model's argument object.
    ///
    /// Errors are reserved for unusable arguments; backend failures are
    /// reported inside the returned text.
    async fn execute(&self, params: Value) -> Result<String>;

    /// Definition sent to the model.
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// Read a required string argument. A bare string is accepted in place of
/// the argument object.
fn string_param<'a>(params: &'a Value, key: &str) -> Result<&'a str> {
    let value = match params {
        Value::String(s) => s.as_str(),
        other => other.get(key).and_then(Value::as_str).unwrap_or(""),
    };
    if value.trim().is_empty() {
        anyhow::bail!("{} must not be empty", key);
    }
    Ok(value)
}

// ═══════════════════════════════════════════════════════════════════════
// Similar-ticket lookup
// ═══════════════════════════════════════════════════════════════════════

/// Backend for the similar-ticket tool.
#[async_trait]
pub trait SimilarTickets: Send + Sync {
    async fn similar(&self, description: &str) -> Result<Vec<Ticket>>;
}

/// Placeholder ticket carrying only a search description.
pub fn query_ticket(description: &str) -> Ticket {
    Ticket {
        ticket_id: "SEARCH-QUERY".to_string(),
        creation_date: "2024-01-01".to_string(),
        priority: TicketPriority::Medium,
        owner: "Agent".to_string(),
        description: description.to_string(),
        impact: "Unknown".to_string(),
        actions: "None".to_string(),
    }
}

/// Calls `POST {base_url}/api/get_similar_tickets` on the ticket API.
pub struct HttpSimilarTickets {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpSimilarTickets {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/api/get_similar_tickets", base_url.trim_end_matches('/')),
        })
    }
}

#[async_trait]
impl SimilarTickets for HttpSimilarTickets {
    async fn similar(&self, description: &str) -> Result<Vec<Ticket>> {
        let tickets = self
            .client
            .post(&self.endpoint)
            .json(&query_ticket(description))
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<Ticket>>()
            .await?;
        Ok(tickets)
    }
}

/// Queries the retrieval service in-process.
pub struct LocalSimilarTickets {
    retrieval: RetrievalService,
}

impl LocalSimilarTickets {
    pub fn new(retrieval: RetrievalService) -> Self {
        Self { retrieval }
    }
}

#[async_trait]
impl SimilarTickets for LocalSimilarTickets {
    async fn similar(&self, description: &str) -> Result<Vec<Ticket>> {
        match self.retrieval.lookup_text(description).await {
            LookupOutcome::Found(tickets) => Ok(tickets),
            LookupOutcome::NoMatches => Ok(Vec::new()),
            LookupOutcome::Failed(e) => Err(e.into()),
        }
    }
}

/// Render lookup results for the model.
pub fn format_similar_tickets(tickets: &[Ticket]) -> String {
    if tickets.is_empty() {
        return "No similar tickets found.".to_string();
    }
    let mut out = String::from("Found similar tickets:\n");
    for (i, t) in tickets.iter().enumerate() {
        out.push_str(&format!(
            "{}. ID: {} - Description: {} - Actions: {}\n",
            i + 1,
            t.ticket_id,
            t.description,
            t.actions
        ));
    }
    out
}

pub struct SimilarTicketsTool {
    backend: Arc<dyn SimilarTickets>,
}

impl SimilarTicketsTool {
    pub fn new(backend: Arc<dyn SimilarTickets>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Tool for SimilarTicketsTool {
    fn name(&self) -> &str {
        "get_similar_tickets"
    }

    fn description(&self) -> &str {
        "Find similar past support tickets in the database. Input should be a detailed description of the problem."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "description": { "type": "string", "description": "Detailed description of the problem" }
            },
            "required": ["description"]
        })
    }

    async fn execute(&self, params: Value) -> Result<String> {
        let description = string_param(&params, "description")?;
        Ok(match self.backend.similar(description).await {
            Ok(tickets) => format_similar_tickets(&tickets),
            Err(e) => format!("Error querying similar tickets: {}", e),
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Web search
// ═══════════════════════════════════════════════════════════════════════

pub struct WebSearchTool {
    search: Arc<dyn WebSearch>,
}

impl WebSearchTool {
    pub fn new(search: Arc<dyn WebSearch>) -> Self {
        Self { search }
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "search_web"
    }

    fn description(&self) -> &str {
        "Search the internet for solutions and documentation. Input should be a search query string."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "Search query" }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, params: Value) -> Result<String> {
        let query = string_param(&params, "query")?;
        Ok(match self.search.search(query).await {
            Ok(results) => results
                .iter()
                .map(|r| format!("Source: {}\nContent: {}", r.url, r.content))
                .collect::<Vec<_>>()
                .join("\n\n"),
            Err(e) => format!("Error searching web: {}", e),
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Registry
// ═══════════════════════════════════════════════════════════════════════

/// Tools available to one agent.
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Registry with the similar-ticket and web-search tools, in that order.
    pub fn for_resolution(similar: Arc<dyn SimilarTickets>, search: Arc<dyn WebSearch>) -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(SimilarTicketsTool::new(similar)));
        registry.register(Box::new(WebSearchTool::new(search)));
        registry
    }

    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.push(tool);
    }

    pub fn find(&self, name: &str) -> Option<&dyn Tool> {
        self.tools
            .iter()
            .find(|t| t.name() == name)
            .map(|t| t.as_ref())
    }

    /// Definitions of every registered tool.
    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tools.iter().map(|t| t.spec()).collect()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::UpstreamError;
    use crate::repository::tests::ticket;
    use crate::websearch::{DisabledSearch, WebResult};

    pub(crate) struct FixedSimilar(pub Vec<Ticket>);

    #[async_trait]
    impl SimilarTickets for FixedSimilar {
        async fn similar(&self, _description: &str) -> Result<Vec<Ticket>> {
            Ok(self.0.clone())
        }
    }

    struct DownSimilar;

    #[async_trait]
    impl SimilarTickets for DownSimilar {
        async fn similar(&self, _description: &str) -> Result<Vec<Ticket>> {
            anyhow::bail!("connection refused")
        }
    }

    pub(crate) struct FixedSearch(pub Vec<WebResult>);

    #[async_trait]
    impl WebSearch for FixedSearch {
        async fn search(&self, _query: &str) -> std::result::Result<Vec<WebResult>, UpstreamError> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn test_similar_tool_formats_tickets() {
        let mut t = ticket("NET-1", "Ops", "VPN drops");
        t.actions = "Reinstalled client".into();
        let tool = SimilarTicketsTool::new(Arc::new(FixedSimilar(vec![t])));

        let out = tool.execute(json!({"description": "vpn"})).await.unwrap();
        assert_eq!(
            out,
            "Found similar tickets:\n1. ID: NET-1 - Description: VPN drops - Actions: Reinstalled client\n"
        );
    }

    #[tokio::test]
    async fn test_similar_tool_empty_and_error() {
        let tool = SimilarTicketsTool::new(Arc::new(FixedSimilar(vec![])));
        assert_eq!(
            tool.execute(json!({"description": "vpn"})).await.unwrap(),
            "No similar tickets found."
        );

        let tool = SimilarTicketsTool::new(Arc::new(DownSimilar));
        let out = tool.execute(json!("vpn")).await.unwrap();
        assert_eq!(out, "Error querying similar tickets: connection refused");
    }

    #[tokio::test]
    async fn test_similar_tool_requires_description() {
        let tool = SimilarTicketsTool::new(Arc::new(FixedSimilar(vec![])));
        assert!(tool.execute(json!({})).await.is_err());
    }

    #[tokio::test]
    async fn test_web_tool_joins_results() {
        let tool = WebSearchTool::new(Arc::new(FixedSearch(vec![
            WebResult { url: "https://a".into(), content: "A".into() },
            WebResult { url: "https://b".into(), content: "B".into() },
        ])));
        let out = tool.execute(json!({"query": "q"})).await.unwrap();
        assert_eq!(out, "Source: https://a\nContent: A\n\nSource: https://b\nContent: B");
    }

    #[tokio::test]
    async fn test_web_tool_error_string() {
        let tool = WebSearchTool::new(Arc::new(DisabledSearch));
        let out = tool.execute(json!({"query": "q"})).await.unwrap();
        assert_eq!(out, "Error searching web: web search is not configured");
    }

    #[test]
    fn test_registry_order_and_specs() {
        let registry = ToolRegistry::for_resolution(
            Arc::new(FixedSimilar(vec![])),
            Arc::new(DisabledSearch),
        );
        assert_eq!(registry.specs().len(), 2);
        let specs = registry.specs();
        assert_eq!(specs[0].name, "get_similar_tickets");
        assert_eq!(specs[1].name, "search_web");
        assert!(registry.find("search_web").is_some());
        assert!(registry.find("delete_everything").is_none());
    }

    #[test]
    fn test_query_ticket_shape() {
        let v = serde_json::to_value(query_ticket("printer offline")).unwrap();
        assert_eq!(v["ticketId"], "SEARCH-QUERY");
        assert_eq!(v["priority"], "Medium");
        assert_eq!(v["description"], "printer offline");
    }
}
