//! OpenAI-compatible chat completion client (`/chat/completions`).
//!
//! Works against Groq (the default base URL), OpenAI, and local servers
//! that speak the same protocol. Wire types are private to this module.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};

use super::{AssistantTurn, ChatMessage, ChatModel, ChatOptions, Role, ToolCall, ToolSpec};
use crate::config::LlmConfig;
use crate::error::UpstreamError;

#[derive(Debug, Clone)]
pub struct OpenAiCompatibleChat {
    client: Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl OpenAiCompatibleChat {
    /// Build a client from `[llm]`. The key is read from `GROQ_API_KEY`,
    /// then `LLM_API_KEY`; without one no `Authorization` header is sent.
    pub fn from_config(config: &LlmConfig) -> Result<Self, UpstreamError> {
        let api_key = std::env::var("GROQ_API_KEY")
            .or_else(|_| std::env::var("LLM_API_KEY"))
            .ok()
            .filter(|k| !k.is_empty());
        Self::new(&config.api_base_url, &config.model, config.timeout_secs, api_key)
    }

    pub fn new(
        api_base_url: &str,
        model: &str,
        timeout_secs: u64,
        api_key: Option<String>,
    ) -> Result<Self, UpstreamError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| UpstreamError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", api_base_url.trim_end_matches('/')),
            model: model.to_string(),
            api_key,
        })
    }
}

#[async_trait]
impl ChatModel for OpenAiCompatibleChat {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn converse(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolSpec],
        options: ChatOptions,
    ) -> Result<AssistantTurn, UpstreamError> {
        let payload = ChatCompletionRequest {
            model: &self.model,
            messages: messages.iter().map(WireMessage::from).collect(),
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            tools: tools.iter().map(WireTool::from).collect(),
        };

        debug!(
            model = %self.model,
            messages = messages.len(),
            tools = tools.len(),
            "sending chat request"
        );

        let mut req = self.client.post(&self.endpoint).json(&payload);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let response = req.send().await.map_err(|e| {
            error!(url = %self.endpoint, error = %e, "chat request failed (transport)");
            UpstreamError::Request(e.to_string())
        })?;
        let response = check_status(response).await?;

        let parsed = response
            .json::<ChatCompletionResponse>()
            .await
            .map_err(|e| UpstreamError::Response(format!("failed to parse response body: {e}")))?;

        let message = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or_else(|| UpstreamError::Response("response has no choices".into()))?;

        Ok(message.into())
    }
}

// ── Wire types ──────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool>,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: Role,
    content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<WireToolCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl From<&ChatMessage> for WireMessage {
    fn from(m: &ChatMessage) -> Self {
        Self {
            role: m.role,
            content: m.content.clone(),
            tool_calls: m.tool_calls.iter().map(WireToolCall::from).collect(),
            tool_call_id: m.tool_call_id.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type", default = "function_type")]
    kind: String,
    function: WireFunctionCall,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    /// JSON-encoded argument object.
    #[serde(default)]
    arguments: String,
}

fn function_type() -> String {
    "function".to_string()
}

impl From<&ToolCall> for WireToolCall {
    fn from(c: &ToolCall) -> Self {
        let arguments = match &c.arguments {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        Self {
            id: c.id.clone(),
            kind: function_type(),
            function: WireFunctionCall {
                name: c.name.clone(),
                arguments,
            },
        }
    }
}

impl From<WireToolCall> for ToolCall {
    fn from(c: WireToolCall) -> Self {
        let arguments = serde_json::from_str(&c.function.arguments)
            .unwrap_or(serde_json::Value::String(c.function.arguments));
        Self {
            id: c.id,
            name: c.function.name,
            arguments,
        }
    }
}

#[derive(Debug, Serialize)]
struct WireTool {
    #[serde(rename = "type")]
    kind: &'static str,
    function: WireFunctionDef,
}

#[derive(Debug, Serialize)]
struct WireFunctionDef {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

impl From<&ToolSpec> for WireTool {
    fn from(t: &ToolSpec) -> Self {
        Self {
            kind: "function",
            function: WireFunctionDef {
                name: t.name.clone(),
                description: t.description.clone(),
                parameters: t.parameters.clone(),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<WireToolCall>>,
}

impl From<ChoiceMessage> for AssistantTurn {
    fn from(m: ChoiceMessage) -> Self {
        Self {
            content: m.content.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
            tool_calls: m
                .tool_calls
                .unwrap_or_default()
                .into_iter()
                .map(ToolCall::from)
                .collect(),
        }
    }
}

// Error envelope used by OpenAI and compatible APIs.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
    #[serde(default)]
    code: Option<serde_json::Value>,
}

/// Return the response if successful, or a structured error.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, UpstreamError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<failed to read error body>".to_string());

    let message = error_message(&body);
    error!(%status, %message, "chat request returned HTTP error");
    Err(UpstreamError::Status {
        status: status.as_u16(),
        message,
    })
}

fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(env) => match env.error.code {
            Some(serde_json::Value::String(code)) => format!("{} [code={}]", env.error.message, code),
            Some(other) => format!("{} [code={}]", env.error.message, other),
            None => env.error.message,
        },
        Err(_) => body.to_string(),
    }
}
