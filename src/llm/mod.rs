//! Chat-model abstraction.
//!
//! The [`ChatModel`] trait has one required round-trip, [`ChatModel::converse`],
//! which sends a message history plus optional tool definitions and returns
//! the assistant's turn. [`ChatModel::complete`] is the single-shot
//! system + user helper used by the summarizers.
//!
//! Tool-call loops belong to the caller (see [`crate::agent`]); providers
//! are stateless.

mod openai_compatible;

pub use openai_compatible::OpenAiCompatibleChat;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::UpstreamError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    /// Parsed JSON arguments. Unparseable argument strings are kept as
    /// `Value::String`.
    pub arguments: serde_json::Value,
}

/// One entry of a conversation history.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: Option<String>,
    /// Set on assistant turns that request tools.
    pub tool_calls: Vec<ToolCall>,
    /// Set on tool results.
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self::text(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::text(Role::User, content)
    }

    pub fn assistant(turn: &AssistantTurn) -> Self {
        Self {
            role: Role::Assistant,
            content: turn.content.clone(),
            tool_calls: turn.tool_calls.clone(),
            tool_call_id: None,
        }
    }

    pub fn tool_result(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: Some(call_id.into()),
        }
    }

    fn text(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }
}

/// Function-tool definition advertised to the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON Schema of the arguments object.
    pub parameters: serde_json::Value,
}

/// Sampling options for one request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChatOptions {
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

/// The assistant's reply: final text, tool requests, or both.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssistantTurn {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
}

impl AssistantTurn {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            tool_calls: Vec::new(),
        }
    }

    pub fn wants_tools(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Model identifier, for logging.
    fn model_name(&self) -> &str;

    /// One round-trip over a message history.
    async fn converse(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolSpec],
        options: ChatOptions,
    ) -> Result<AssistantTurn, UpstreamError>;

    /// Single system + user completion. Returns an empty string when the
    /// model produced no text.
    async fn complete(
        &self,
        system: &str,
        user: &str,
        temperature: f32,
        max_tokens: Option<u32>,
    ) -> Result<String, UpstreamError> {
        let messages = [ChatMessage::system(system), ChatMessage::user(user)];
        let options = ChatOptions {
            temperature,
            max_tokens,
        };
        let turn = self.converse(&messages, &[], options).await?;
        Ok(turn.content.unwrap_or_default())
    }
}


#[cfg(test)]
mod tests {
    use super::fake::ScriptedChat;
    use super::*;

    #[tokio::test]
    async fn test_complete_sends_system_then_user() {
        let model = ScriptedChat::replying("hello");
        let text = model.complete("be brief", "hi", 0.7, Some(1024)).await.unwrap();
        assert_eq!(text, "hello");

        let requests = model.requests.lock().unwrap();
        let (messages, tools, options) = &requests[0];
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1].content.as_deref(), Some("hi"));
        assert!(tools.is_empty());
        assert_eq!(options.max_tokens, Some(1024));
    }

    #[tokio::test]
    async fn test_complete_empty_content_is_empty_string() {
        let model = ScriptedChat::new(vec![Ok(AssistantTurn::default())]);
        assert_eq!(model.complete("s", "u", 0.0, None).await.unwrap(), "");
    }

    #[test]
    fn test_role_serializes_lowercase() {
        assert_eq!(serde_json::to_value(Role::Assistant).unwrap(), "assistant");
    }
}
