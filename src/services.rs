//! Wiring: build the service graph from configuration.
//!
//! Every collaborator is constructed once here and injected as a trait
//! object, so tests can assemble the same services around fakes.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use crate::agent::ResolutionAgent;
use crate::augment::AugmentationService;
use crate::chunk::ChunkParams;
use crate::config::Config;
use crate::llm::{ChatModel, OpenAiCompatibleChat};
use crate::news::NewsSummarizer;
use crate::repository::TicketRepository;
use crate::retrieval::RetrievalService;
use crate::store::{create_store, VectorStore};
use crate::traits::{HttpSimilarTickets, LocalSimilarTickets, SimilarTickets, ToolRegistry};
use crate::websearch::{create_web_search, WebSearch};

/// Ticket services sharing one vector store and one chat model.
#[derive(Clone)]
pub struct Services {
    pub repository: TicketRepository,
    pub retrieval: RetrievalService,
    pub augment: Arc<AugmentationService>,
    pub news: Arc<NewsSummarizer>,
}

impl Services {
    /// Assemble services around the given store and model.
    pub fn new(config: &Config, store: Arc<dyn VectorStore>, model: Arc<dyn ChatModel>) -> Self {
        let repository = TicketRepository::new(
            store,
            ChunkParams::from(&config.chunking),
            config.ingest.min_description_chars,
        );
        let retrieval = RetrievalService::new(repository.clone(), config.retrieval.top_k);
        let augment = Arc::new(AugmentationService::new(
            retrieval.clone(),
            model.clone(),
            config.llm.temperature,
        ));
        let news = Arc::new(NewsSummarizer::new(model, config.llm.temperature));

        Self {
            repository,
            retrieval,
            augment,
            news,
        }
    }

    /// Build the configured store and chat model, then assemble services.
    pub fn from_config(config: &Config) -> Result<Self> {
        let store = create_store(config)?;
        let model = create_chat_model(config)?;
        info!(
            store = %config.vector_store.provider,
            embedding = %config.embedding.provider,
            model = %model.model_name(),
            "services ready"
        );
        Ok(Self::new(config, store, model))
    }
}

pub fn create_chat_model(config: &Config) -> Result<Arc<dyn ChatModel>> {
    let chat = OpenAiCompatibleChat::from_config(&config.llm).context("Failed to build chat client")?;
    Ok(Arc::new(chat))
}

/// Build the resolution agent with its two tools.
pub fn build_agent(
    config: &Config,
    model: Arc<dyn ChatModel>,
    similar: Arc<dyn SimilarTickets>,
    search: Arc<dyn WebSearch>,
) -> ResolutionAgent {
    ResolutionAgent::new(
        model,
        ToolRegistry::for_resolution(similar, search),
        config.agent.max_steps,
        config.agent.temperature,
    )
}

/// Build the agent from configuration, choosing the similar-ticket backend
/// from `[agent].tool_backend`.
pub fn agent_from_config(config: &Config) -> Result<ResolutionAgent> {
    let model = create_chat_model(config)?;
    let search = create_web_search(&config.web_search)?;

    let similar: Arc<dyn SimilarTickets> = match config.agent.tool_backend.as_str() {
        "local" => {
            let services = Services::new(config, create_store(config)?, model.clone());
            Arc::new(LocalSimilarTickets::new(services.retrieval))
        }
        _ => Arc::new(HttpSimilarTickets::new(
            &config.agent.retrieval_url,
            config.llm.timeout_secs,
        )?),
    };

    info!(
        model = %model.model_name(),
        tool_backend = %config.agent.tool_backend,
        search = %config.web_search.provider,
        max_steps = config.agent.max_steps,
        "agent ready"
    );
    Ok(build_agent(config, model, similar, search))
}
