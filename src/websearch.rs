//! Web search capability.
//!
//! [`TavilySearch`] calls the Tavily REST API; [`DisabledSearch`] always
//! fails with [`UpstreamError::NotConfigured`], which the agent's web tool
//! renders as an error string for the model.

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::config::WebSearchConfig;
use crate::error::UpstreamError;

const TAVILY_ENDPOINT: &str = "https://api.tavily.com/search";

/// One search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebResult {
    pub url: String,
    pub content: String,
}

#[async_trait]
pub trait WebSearch: Send + Sync {
    /// Up to the provider's configured maximum of results for `query`.
    async fn search(&self, query: &str) -> Result<Vec<WebResult>, UpstreamError>;
}

/// Build the provider named by `[web_search].provider`.
pub fn create_web_search(config: &WebSearchConfig) -> anyhow::Result<Arc<dyn WebSearch>> {
    match config.provider.as_str() {
        "tavily" => {
            let search = TavilySearch::from_config(config).context(
                "web search needs TAVILY_API_KEY; set it or use [web_search] provider = \"disabled\"",
            )?;
            Ok(Arc::new(search))
        }
        "disabled" => Ok(Arc::new(DisabledSearch)),
        other => anyhow::bail!("Unknown web search provider: {}", other),
    }
}

pub struct TavilySearch {
    client: reqwest::Client,
    api_key: String,
    max_results: usize,
}

impl TavilySearch {
    /// Requires `TAVILY_API_KEY`.
    pub fn from_config(config: &WebSearchConfig) -> Result<Self, UpstreamError> {
        let api_key = std::env::var("TAVILY_API_KEY").ok().filter(|k| !k.is_empty());
        Self::with_key(config, api_key)
    }

    pub fn with_key(config: &WebSearchConfig, api_key: Option<String>) -> Result<Self, UpstreamError> {
        let api_key = api_key.ok_or_else(|| UpstreamError::NotConfigured("TAVILY_API_KEY".to_string()))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            api_key,
            max_results: config.max_results,
        })
    }
}

#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    query: &'a str,
    max_results: usize,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
}

#[async_trait]
impl WebSearch for TavilySearch {
    async fn search(&self, query: &str) -> Result<Vec<WebResult>, UpstreamError> {
        let body = TavilyRequest {
            query,
            max_results: self.max_results,
        };
        let response = self
            .client
            .post(TAVILY_ENDPOINT)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: TavilyResponse = response
            .json()
            .await
            .map_err(|e| UpstreamError::Response(e.to_string()))?;
        debug!(query, results = parsed.results.len(), "web search finished");

        Ok(parsed
            .results
            .into_iter()
            .take(self.max_results)
            .map(|r| WebResult {
                url: r.url,
                content: r.content,
            })
            .collect())
    }
}

/// Provider used when no search backend is configured.
pub struct DisabledSearch;

#[async_trait]
impl WebSearch for DisabledSearch {
    async fn search(&self, _query: &str) -> Result<Vec<WebResult>, UpstreamError> {
        Err(UpstreamError::NotConfigured("web search".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_search_errors() {
        let err = DisabledSearch.search("outlook").await.unwrap_err();
        assert_eq!(err.to_string(), "web search is not configured");
    }

    #[test]
    fn test_parse_tavily_response() {
        let raw = serde_json::json!({
            "query": "q",
            "results": [
                { "title": "t", "url": "https://a.example", "content": "A", "score": 0.9 },
                { "url": "https://b.example", "content": "B" }
            ]
        });
        let parsed: TavilyResponse = serde_json::from_value(raw).unwrap();
        assert_eq!(parsed.results.len(), 2);
        assert_eq!(parsed.results[1].url, "https://b.example");
    }

    #[test]
    fn test_create_disabled() {
        let config = WebSearchConfig {
            provider: "disabled".to_string(),
            ..WebSearchConfig::default()
        };
        assert!(create_web_search(&config).is_ok());
    }

    #[test]
    fn test_tavily_without_key_is_not_configured() {
        let err = TavilySearch::with_key(&WebSearchConfig::default(), None)
            .err()
            .unwrap();
        assert_eq!(err.to_string(), "TAVILY_API_KEY is not configured");
        assert!(TavilySearch::with_key(&WebSearchConfig::default(), Some("k".into())).is_ok());
    }
}
