//! Resolution agent: a tool-calling model session that proposes a solution
//! for a ticket.
//!
//! Each step sends the history and the tool definitions to the model. A
//! reply with tool calls runs those tools in order and appends their output
//! as observations; the first reply without tool calls is the answer. The
//! session is capped at `max_steps` model calls.
//!
//! [`ResolutionAgent::solve`] only fails for a ticket without a description.
//! Any failure inside the session is returned as an answer of the form
//! `"Error running agent: ..."`.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{AgentError, UpstreamError};
use crate::llm::{ChatMessage, ChatModel, ChatOptions, ToolCall};
use crate::models::Ticket;
use crate::traits::ToolRegistry;

const SYSTEM_PROMPT: &str = "Answer the following questions as best you can. You have access to tools to find similar tickets and search the web.
Always first check for similar tickets, then search the web if needed.
Propose a complete solution based on the findings.";

pub struct ResolutionAgent {
    model: Arc<dyn ChatModel>,
    tools: ToolRegistry,
    max_steps: usize,
    temperature: f32,
}

impl ResolutionAgent {
    pub fn new(model: Arc<dyn ChatModel>, tools: ToolRegistry, max_steps: usize, temperature: f32) -> Self {
        Self {
            model,
            tools,
            max_steps,
            temperature,
        }
    }

    /// Propose a step-by-step solution for `ticket`.
    pub async fn solve(&self, ticket: &Ticket) -> Result<String, AgentError> {
        if ticket.description.trim().is_empty() {
            return Err(AgentError::EmptyDescription);
        }

        match self.run_session(&ticket.description).await {
            Ok(answer) => {
                info!(ticket_id = %ticket.ticket_id, "agent produced a solution");
                Ok(answer)
            }
            Err(e) => {
                warn!(ticket_id = %ticket.ticket_id, error = %e, "agent session failed");
                Ok(format!("Error running agent: {}", e))
            }
        }
    }

    async fn run_session(&self, description: &str) -> Result<String, AgentError> {
        let specs = self.tools.specs();
        let options = ChatOptions {
            temperature: self.temperature,
            max_tokens: None,
        };
        debug!(
            model = %self.model.model_name(),
            tools = specs.len(),
            max_steps = self.max_steps,
            "starting agent session"
        );
        let mut messages = vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(task_prompt(description)),
        ];

        for step in 0..self.max_steps {
            let turn = self.model.converse(&messages, &specs, options).await?;

            if !turn.wants_tools() {
                debug!(steps = step + 1, "agent finished");
                return turn
                    .content
                    .ok_or_else(|| UpstreamError::Response("model returned an empty answer".into()).into());
            }

            messages.push(ChatMessage::assistant(&turn));
            for call in &turn.tool_calls {
                let observation = self.run_tool(call).await;
                messages.push(ChatMessage::tool_result(&call.id, observation));
            }
        }

        Err(AgentError::StepLimit(self.max_steps))
    }

    async fn run_tool(&self, call: &ToolCall) -> String {
        let Some(tool) = self.tools.find(&call.name) else {
            warn!(tool = %call.name, "model requested unknown tool");
            return format!("Error: unknown tool '{}'", call.name);
        };

        debug!(tool = %call.name, args = %call.arguments, "running tool");
        match tool.execute(call.arguments.clone()).await {
            Ok(output) => output,
            Err(e) => {
                warn!(tool = %call.name, error = %e, "tool call rejected");
                format!("Error: {}", e)
            }
        }
    }
}

fn task_prompt(description: &str) -> String {
    format!(
        r#"I have a support ticket with the following description:
"{}"

Please help me resolve it.
1. First, search for similar tickets in our database to see if this has happened before and what actions were taken.
2. Then, use the web search to find public information or documentation about this error.
3. Finally, combine the information to propose a step-by-step solution.
4. The solution must match the language of the ticket description; please translate it if necessary."#,
        description
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::fake::ScriptedChat;
    use crate::llm::{AssistantTurn, Role};
    use crate::repository::tests::ticket;
    use crate::traits::tests::{FixedSearch, FixedSimilar};
    use crate::websearch::WebResult;
    use serde_json::json;

    fn call(id: &str, name: &str, args: serde_json::Value) -> ToolCall {
        ToolCall {
            id: id.into(),
            name: name.into(),
            arguments: args,
        }
    }

    fn tool_turn(calls: Vec<ToolCall>) -> Result<AssistantTurn, UpstreamError> {
        Ok(AssistantTurn {
            content: None,
            tool_calls: calls,
        })
    }

    fn registry() -> ToolRegistry {
        let mut past = ticket("NET-1", "Ops", "VPN drops");
        past.actions = "Reinstalled client".into();
        ToolRegistry::for_resolution(
            Arc::new(FixedSimilar(vec![past])),
            Arc::new(FixedSearch(vec![WebResult {
                url: "https://kb.example/vpn".into(),
                content: "Update the VPN client".into(),
            }])),
        )
    }

    fn agent(model: Arc<ScriptedChat>, max_steps: usize) -> ResolutionAgent {
        ResolutionAgent::new(model, registry(), max_steps, 0.0)
    }

    #[tokio::test]
    async fn test_empty_description_is_an_error() {
        let model = Arc::new(ScriptedChat::replying("unused"));
        let err = agent(model.clone(), 8)
            .solve(&ticket("T", "Me", "  "))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::EmptyDescription));
        assert_eq!(model.request_count(), 0);
    }

    #[tokio::test]
    async fn test_tools_then_answer() {
        let model = Arc::new(ScriptedChat::new(vec![
            tool_turn(vec![call("c1", "get_similar_tickets", json!({"description": "vpn drops"}))]),
            tool_turn(vec![call("c2", "search_web", json!({"query": "vpn drops"}))]),
            Ok(AssistantTurn::text("1. Reinstall the VPN client.")),
        ]));
        let answer = agent(model.clone(), 8)
            .solve(&ticket("NEW", "Me", "My VPN drops"))
            .await
            .unwrap();
        assert_eq!(answer, "1. Reinstall the VPN client.");

        let requests = model.requests.lock().unwrap();
        assert_eq!(requests.len(), 3);

        let (first, tools, options) = &requests[0];
        assert_eq!(tools.len(), 2);
        assert_eq!(options.temperature, 0.0);
        assert!(first[1].content.as_deref().unwrap().contains("\"My VPN drops\""));

        let (last, _, _) = &requests[2];
        let observations: Vec<&str> = last
            .iter()
            .filter(|m| m.role == Role::Tool)
            .filter_map(|m| m.content.as_deref())
            .collect();
        assert!(observations[0].starts_with("Found similar tickets:\n1. ID: NET-1"));
        assert_eq!(observations[1], "Source: https://kb.example/vpn\nContent: Update the VPN client");
        assert_eq!(last.iter().filter(|m| m.role == Role::Tool).nth(1).unwrap().tool_call_id.as_deref(), Some("c2"));
    }

    #[tokio::test]
    async fn test_model_failure_becomes_answer() {
        let model = Arc::new(ScriptedChat::failing("rate limited"));
        let answer = agent(model, 8)
            .solve(&ticket("NEW", "Me", "Printer offline"))
            .await
            .unwrap();
        assert!(answer.starts_with("Error running agent: "));
        assert!(answer.contains("rate limited"));
    }

    #[tokio::test]
    async fn test_step_limit_becomes_answer() {
        let looping = (0..3)
            .map(|i| tool_turn(vec![call(&format!("c{}", i), "search_web", json!({"query": "x"}))]))
            .collect();
        let model = Arc::new(ScriptedChat::new(looping));
        let answer = agent(model.clone(), 2)
            .solve(&ticket("NEW", "Me", "Printer offline"))
            .await
            .unwrap();
        assert_eq!(
            answer,
            "Error running agent: agent did not produce a final answer within 2 steps"
        );
        assert_eq!(model.request_count(), 2);
    }

    #[tokio::test]
    async fn test_unknown_tool_is_reported_to_model() {
        let model = Arc::new(ScriptedChat::new(vec![
            tool_turn(vec![call("c1", "format_disk", json!({}))]),
            Ok(AssistantTurn::text("done")),
        ]));
        let answer = agent(model.clone(), 8)
            .solve(&ticket("NEW", "Me", "Printer offline"))
            .await
            .unwrap();
        assert_eq!(answer, "done");

        let requests = model.requests.lock().unwrap();
        let observation = requests[1].0.last().unwrap().content.clone().unwrap();
        assert_eq!(observation, "Error: unknown tool 'format_disk'");
    }
}
