//! TOML configuration.
//!
//! Every section has defaults, so an empty file yields a working in-memory
//! setup. API keys are never read from TOML: they come from the environment
//! (optionally populated from a `.env` file by the binary).

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub vector_store: VectorStoreConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub web_search: WebSearchConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
    #[serde(default = "default_overlap_chars")]
    pub overlap_chars: usize,
    #[serde(default = "default_max_chars")]
    pub split_threshold: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chars: default_max_chars(),
            overlap_chars: default_overlap_chars(),
            split_threshold: default_max_chars(),
        }
    }
}

fn default_max_chars() -> usize {
    200
}
fn default_overlap_chars() -> usize {
    20
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    #[serde(default = "default_min_description_chars")]
    pub min_description_chars: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            min_description_chars: default_min_description_chars(),
        }
    }
}

fn default_min_description_chars() -> usize {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

fn default_top_k() -> usize {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct VectorStoreConfig {
    /// `memory` or `pinecone`.
    #[serde(default = "default_store_provider")]
    pub provider: String,
    /// Pinecone index host, e.g. `https://tickets-abc123.svc.us-east-1.pinecone.io`.
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            provider: default_store_provider(),
            host: None,
            namespace: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_store_provider() -> String {
    "memory".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    /// `hash`, `ollama`, or `openai`.
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_dims")]
    pub dims: usize,
    /// Base URL for the Ollama provider.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: None,
            dims: default_dims(),
            url: None,
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_embedding_provider() -> String {
    "hash".to_string()
}
fn default_dims() -> usize {
    384
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_llm_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    /// Sampling temperature for summaries.
    #[serde(default = "default_llm_temperature")]
    pub temperature: f32,
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_llm_base_url(),
            model: default_llm_model(),
            temperature: default_llm_temperature(),
            timeout_secs: default_llm_timeout_secs(),
        }
    }
}

fn default_llm_base_url() -> String {
    "https://api.groq.com/openai/v1".to_string()
}
fn default_llm_model() -> String {
    "llama-3.1-8b-instant".to_string()
}
fn default_llm_temperature() -> f32 {
    0.7
}
fn default_llm_timeout_secs() -> u64 {
    120
}

#[derive(Debug, Deserialize, Clone)]
pub struct WebSearchConfig {
    /// `tavily` (default, needs `TAVILY_API_KEY`) or `disabled`.
    #[serde(default = "default_search_provider")]
    pub provider: String,
    #[serde(default = "default_search_max_results")]
    pub max_results: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for WebSearchConfig {
    fn default() -> Self {
        Self {
            provider: default_search_provider(),
            max_results: default_search_max_results(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_search_provider() -> String {
    "tavily".to_string()
}
fn default_search_max_results() -> usize {
    3
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_api_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_api_bind(),
        }
    }
}

fn default_api_bind() -> String {
    "0.0.0.0:8000".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct AgentConfig {
    #[serde(default = "default_agent_bind")]
    pub bind: String,
    /// `http` calls the ticket API at `retrieval_url`; `local` queries the
    /// configured vector store in-process.
    #[serde(default = "default_tool_backend")]
    pub tool_backend: String,
    #[serde(default = "default_retrieval_url")]
    pub retrieval_url: String,
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
    #[serde(default)]
    pub temperature: f32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            bind: default_agent_bind(),
            tool_backend: default_tool_backend(),
            retrieval_url: default_retrieval_url(),
            max_steps: default_max_steps(),
            temperature: 0.0,
        }
    }
}

fn default_agent_bind() -> String {
    "0.0.0.0:8001".to_string()
}
fn default_tool_backend() -> String {
    "http".to_string()
}
fn default_retrieval_url() -> String {
    "http://localhost:8000".to_string()
}
fn default_max_steps() -> usize {
    8
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}

/// Parse and validate configuration from a TOML string.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    // Chunking
    if config.chunking.max_chars == 0 {
        bail!("chunking.max_chars must be > 0");
    }
    if config.chunking.overlap_chars >= config.chunking.max_chars {
        bail!("chunking.overlap_chars must be smaller than chunking.max_chars");
    }
    if config.chunking.split_threshold > config.chunking.max_chars {
        bail!("chunking.split_threshold must not exceed chunking.max_chars");
    }

    // Retrieval
    if config.retrieval.top_k < 1 {
        bail!("retrieval.top_k must be >= 1");
    }

    match config.vector_store.provider.as_str() {
        "memory" => {}
        "pinecone" => {
            if config.vector_store.host.is_none() {
                bail!("vector_store.host must be set when provider is 'pinecone'");
            }
        }
        other => bail!(
            "Unknown vector store provider: '{}'. Must be memory or pinecone.",
            other
        ),
    }

    match config.embedding.provider.as_str() {
        "hash" | "ollama" | "openai" => {}
        other => bail!(
            "Unknown embedding provider: '{}'. Must be hash, ollama, or openai.",
            other
        ),
    }
    if config.embedding.dims == 0 {
        bail!("embedding.dims must be > 0");
    }

    match config.web_search.provider.as_str() {
        "tavily" | "disabled" => {}
        other => bail!(
            "Unknown web search provider: '{}'. Must be tavily or disabled.",
            other
        ),
    }

    match config.agent.tool_backend.as_str() {
        "http" | "local" => {}
        other => bail!(
            "Unknown agent tool backend: '{}'. Must be http or local.",
            other
        ),
    }
    if config.agent.max_steps == 0 {
        bail!("agent.max_steps must be > 0");
    }

    crate::logging::parse_level(&config.logging.level)
        .with_context(|| "Invalid [logging] section")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let cfg = parse_config("").unwrap();
        assert_eq!(cfg.chunking.max_chars, 200);
        assert_eq!(cfg.chunking.overlap_chars, 20);
        assert_eq!(cfg.chunking.split_threshold, 200);
        assert_eq!(cfg.ingest.min_description_chars, 5);
        assert_eq!(cfg.retrieval.top_k, 5);
        assert_eq!(cfg.vector_store.provider, "memory");
        assert_eq!(cfg.web_search.provider, "tavily");
        assert_eq!(cfg.web_search.max_results, 3);
        assert_eq!(cfg.server.bind, "0.0.0.0:8000");
        assert_eq!(cfg.agent.bind, "0.0.0.0:8001");
        assert_eq!(cfg.agent.tool_backend, "http");
    }

    #[test]
    fn test_partial_section() {
        let cfg = parse_config(
            r#"
[retrieval]
top_k = 3

[llm]
model = "llama-3.3-70b-versatile"
"#,
        )
        .unwrap();
        assert_eq!(cfg.retrieval.top_k, 3);
        assert_eq!(cfg.llm.model, "llama-3.3-70b-versatile");
        assert_eq!(cfg.llm.api_base_url, "https://api.groq.com/openai/v1");
    }

    #[test]
    fn test_overlap_must_be_smaller_than_max() {
        let err = parse_config("[chunking]\nmax_chars = 50\noverlap_chars = 50\nsplit_threshold = 50")
            .unwrap_err();
        assert!(err.to_string().contains("overlap_chars"));
    }

    #[test]
    fn test_pinecone_requires_host() {
        let err = parse_config("[vector_store]\nprovider = \"pinecone\"").unwrap_err();
        assert!(err.to_string().contains("vector_store.host"));
    }

    #[test]
    fn test_unknown_providers_rejected() {
        assert!(parse_config("[embedding]\nprovider = \"magic\"").is_err());
        assert!(parse_config("[web_search]\nprovider = \"bing\"").is_err());
        assert!(parse_config("[agent]\ntool_backend = \"grpc\"").is_err());
        assert!(parse_config("[logging]\nlevel = \"loud\"").is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_config(Path::new("/nonexistent/tkt.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
