//! News summarization.
//!
//! Cleans a `{title, content}` pair, asks the model for a short summary plus
//! key points as JSON (`resumen`, `puntos_clave`), and parses the reply with
//! the tolerant reply parser.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{NewsError, ValidationError};
use crate::llm::ChatModel;
use crate::reply::{parse_structured_reply, SummarySource};

const MAX_TOKENS: u32 = 1024;
const UNAVAILABLE: &str = "Summary not available";

const SYSTEM_PROMPT: &str = r#"You are an assistant that summarizes news articles concisely and clearly.
Provide a summary of 100 characters or less and a list of the key concepts or tags the article mentions.
ALWAYS answer in JSON like the following:
{
    "resumen": "<your summary>",
    "puntos_clave": ["<key point>", "..."]
}"#;

#[derive(Debug, Clone, Deserialize)]
pub struct NewsInput {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsSummary {
    pub original_title: String,
    pub summary: String,
    /// Character count of `summary`.
    pub summary_length: usize,
    pub key_points: Vec<String>,
}

/// Strip surrounding quotes and whitespace, and collapse doubled quotes.
pub fn clean_title(title: &str) -> String {
    let trimmed = title.trim_matches(|c: char| c == '"' || c.is_whitespace());
    trimmed.replace("\"\"", "\"").trim().to_string()
}

/// Collapse every whitespace run to a single space.
pub fn clean_content(content: &str) -> String {
    content.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub struct NewsSummarizer {
    model: Arc<dyn ChatModel>,
    temperature: f32,
}

impl NewsSummarizer {
    pub fn new(model: Arc<dyn ChatModel>, temperature: f32) -> Self {
        Self { model, temperature }
    }

    pub async fn summarize(&self, input: &NewsInput) -> Result<NewsSummary, NewsError> {
        let title = clean_title(&input.title);
        if title.is_empty() {
            return Err(ValidationError::EmptyField("title").into());
        }
        let content = clean_content(&input.content);
        if content.is_empty() {
            return Err(ValidationError::EmptyField("content").into());
        }

        let user = format!("Title: {}\n\nContent: {}", title, content);
        let raw = self
            .model
            .complete(SYSTEM_PROMPT, &user, self.temperature, Some(MAX_TOKENS))
            .await?;

        let (summary, key_points) = if raw.trim().is_empty() {
            (UNAVAILABLE.to_string(), Vec::new())
        } else {
            let reply = parse_structured_reply(&raw, "resumen", "puntos_clave");
            if reply.source == SummarySource::RawText {
                warn!("news summary reply was not JSON, using raw text");
            }
            (reply.summary.trim().to_string(), reply.items)
        };

        info!(title = %title, summary_length = summary.chars().count(), "news summarized");
        Ok(NewsSummary {
            original_title: title,
            summary_length: summary.chars().count(),
            summary,
            key_points,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::fake::ScriptedChat;

    fn input(title: &str, content: &str) -> NewsInput {
        NewsInput {
            title: title.to_string(),
            content: content.to_string(),
        }
    }

    #[test]
    fn test_clean_title() {
        assert_eq!(clean_title("  \"Rust 2.0 \"\"released\"\"\"  "), "Rust 2.0 \"released");
        assert_eq!(clean_title("\"\"\"   "), "");
        assert_eq!(clean_title("Plain"), "Plain");
    }

    #[test]
    fn test_clean_content() {
        assert_eq!(clean_content("  a\n\n b\t c  "), "a b c");
    }

    #[tokio::test]
    async fn test_summarize_parses_json() {
        let model = Arc::new(ScriptedChat::replying(
            "{\"resumen\": \"Ñandú escapes zoo\", \"puntos_clave\": [\"zoo\", \"bird\"]}",
        ));
        let summarizer = NewsSummarizer::new(model.clone(), 0.7);
        let out = summarizer
            .summarize(&input("\"Bird escapes\"", "A bird   escaped\nthe zoo."))
            .await
            .unwrap();

        assert_eq!(out.original_title, "Bird escapes");
        assert_eq!(out.summary, "Ñandú escapes zoo");
        assert_eq!(out.summary_length, 17);
        assert_eq!(out.key_points, vec!["zoo", "bird"]);

        let requests = model.requests.lock().unwrap();
        let (messages, _, options) = &requests[0];
        assert_eq!(options.max_tokens, Some(1024));
        assert_eq!(
            messages[1].content.as_deref(),
            Some("Title: Bird escapes\n\nContent: A bird escaped the zoo.")
        );
    }

    #[tokio::test]
    async fn test_empty_reply_is_unavailable() {
        let summarizer = NewsSummarizer::new(Arc::new(ScriptedChat::replying("   ")), 0.7);
        let out = summarizer.summarize(&input("T", "C")).await.unwrap();
        assert_eq!(out.summary, "Summary not available");
        assert_eq!(out.summary_length, 21);
        assert!(out.key_points.is_empty());
    }

    #[tokio::test]
    async fn test_non_json_reply_is_summary() {
        let summarizer = NewsSummarizer::new(Arc::new(ScriptedChat::replying(" Markets rallied. ")), 0.7);
        let out = summarizer.summarize(&input("T", "C")).await.unwrap();
        assert_eq!(out.summary, "Markets rallied.");
        assert_eq!(out.summary_length, 16);
    }

    #[tokio::test]
    async fn test_empty_fields_rejected_before_model() {
        let model = Arc::new(ScriptedChat::replying("unused"));
        let summarizer = NewsSummarizer::new(model.clone(), 0.7);
        assert!(matches!(
            summarizer.summarize(&input("\"\"", "body")).await,
            Err(NewsError::Invalid(ValidationError::EmptyField("title")))
        ));
        assert!(matches!(
            summarizer.summarize(&input("T", " \n ")).await,
            Err(NewsError::Invalid(ValidationError::EmptyField("content")))
        ));
        assert_eq!(model.request_count(), 0);
    }

    #[tokio::test]
    async fn test_upstream_failure_is_error() {
        let summarizer = NewsSummarizer::new(Arc::new(ScriptedChat::failing("timeout")), 0.7);
        assert!(matches!(
            summarizer.summarize(&input("T", "C")).await,
            Err(NewsError::Upstream(_))
        ));
    }
}
