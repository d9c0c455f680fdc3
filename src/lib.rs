//! # Ticket Harness
//!
//! Support-ticket ingestion, similarity retrieval and model-assisted
//! resolution.
//!
//! Tickets are chunked, embedded and written to a vector index. Incoming
//! tickets are matched against that index, the matches are summarized by a
//! chat model together with the people who handled them, and a tool-using
//! agent combines past tickets with web search to propose a solution.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────┐   ┌──────────────┐
//! │  Ingest  │──▶│  Repository  │──▶│ Vector store │
//! │ JSON/API │   │ Chunk+Embed  │   │ memory/pinec.│
//! └──────────┘   └──────┬───────┘   └──────────────┘
//!                       │
//!              ┌────────┴────────┐
//!              ▼                 ▼
//!       ┌────────────┐    ┌────────────┐    ┌───────────┐
//!       │ Retrieval  │──▶ │  Augment   │    │   Agent   │
//!       │  top-k     │    │ summary +  │    │ tools +   │
//!       └────────────┘    │ contacts   │    │ web search│
//!                         └────────────┘    └───────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! tkt serve api                     # ticket API on :8000
//! tkt serve agent                   # agent API on :8001
//! tkt augment ./incoming.json       # summary + contacts for one ticket
//! tkt solve ./incoming.json         # agent-proposed solution
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Ticket and result types |
//! | [`error`] | Typed errors shared across modules |
//! | [`chunk`] | Description chunking |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`store`] | Vector store abstraction (in-memory, Pinecone) |
//! | [`repository`] | Ticket storage and similarity lookup |
//! | [`ingest`] | Single-ticket and batch ingestion |
//! | [`retrieval`] | Top-k retrieval of similar tickets |
//! | [`reply`] | Tolerant parsing of model replies |
//! | [`llm`] | Chat model abstraction (OpenAI-compatible) |
//! | [`augment`] | Summary and contacts from similar tickets |
//! | [`websearch`] | Web search abstraction (Tavily) |
//! | [`traits`] | Agent tools and registry |
//! | [`agent`] | Tool-using resolution agent |
//! | [`news`] | News summarization |
//! | [`services`] | Service wiring from configuration |
//! | [`server`] | HTTP servers |
//! | [`logging`] | Tracing subscriber setup |

pub mod agent;
pub mod augment;
pub mod chunk;
pub mod config;
pub mod embedding;
pub mod error;
pub mod ingest;
pub mod llm;
pub mod logging;
pub mod models;
pub mod news;
pub mod reply;
pub mod repository;
pub mod retrieval;
pub mod server;
pub mod services;
pub mod store;
pub mod traits;
pub mod websearch;
