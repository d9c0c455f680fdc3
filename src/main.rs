//! # Ticket Harness CLI (`tkt`)
//!
//! Ingest support tickets into a vector index, look up similar tickets,
//! summarize them, ask the resolution agent for a solution, or run the HTTP
//! servers.
//!
//! ## Usage
//!
//! ```bash
//! tkt --config ./config/tkt.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `tkt ingest <file>` | Ingest a JSON array of tickets |
//! | `tkt ingest-ticket <file>` | Ingest one ticket from a JSON file |
//! | `tkt similar <file>` | Print tickets similar to the one in `<file>` |
//! | `tkt augment <file>` | Print `{summary, contacts}` for the ticket in `<file>` |
//! | `tkt solve <file>` | Print the agent's proposed solution |
//! | `tkt serve api` | Start the ticket API (default `0.0.0.0:8000`) |
//! | `tkt serve agent` | Start the agent API (default `0.0.0.0:8001`) |
//!
//! With the default in-memory store the index lives only as long as the
//! process, so `ingest` followed by `similar` needs a persistent store
//! (`[vector_store] provider = "pinecone"`) or a running `serve api`.
//!
//! API keys are read from the environment; a `.env` file in the working
//! directory is loaded first if present. `tkt solve` and `tkt serve agent`
//! need `TAVILY_API_KEY` for the agent's web search tool unless
//! `[web_search] provider = "disabled"`, in which case that tool only ever
//! reports an error to the model.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use ticket_harness::config::{self, Config};
use ticket_harness::ingest::{ingest_batch, ingest_one};
use ticket_harness::models::Ticket;
use ticket_harness::services::{agent_from_config, Services};
use ticket_harness::{logging, server};

const DEFAULT_CONFIG: &str = "./config/tkt.toml";

/// Ticket Harness: similar-ticket retrieval, summaries, and an agent that
/// proposes solutions for support tickets.
#[derive(Parser)]
#[command(name = "tkt", version, about)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/tkt.toml`; built-in defaults are used when
    /// that file does not exist.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest a JSON file containing an array of tickets.
    ///
    /// The whole file is rejected if any entry does not parse as a ticket;
    /// entries with invalid values are skipped individually.
    Ingest {
        file: PathBuf,
    },
    /// Ingest a single ticket from a JSON file.
    IngestTicket {
        file: PathBuf,
    },
    /// Print tickets similar to the one in a JSON file.
    Similar {
        file: PathBuf,
    },
    /// Summarize similar tickets and list contacts.
    Augment {
        file: PathBuf,
    },
    /// Ask the resolution agent for a step-by-step solution.
    Solve {
        file: PathBuf,
    },
    /// Start an HTTP server.
    Serve {
        #[command(subcommand)]
        service: ServeService,
    },
}

#[derive(Subcommand)]
enum ServeService {
    /// Ticket API: ingestion, retrieval, augmentation, news summaries.
    Api,
    /// Agent API: `/solve_ticket`.
    Agent,
}

fn resolve_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(p) => config::load_config(p),
        None if Path::new(DEFAULT_CONFIG).exists() => config::load_config(Path::new(DEFAULT_CONFIG)),
        None => config::parse_config(""),
    }
}

fn read_ticket(path: &Path) -> Result<Ticket> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read ticket file: {}", path.display()))?;
    let ticket: Ticket = serde_json::from_str(&content)
        .with_context(|| format!("Invalid ticket JSON in {}", path.display()))?;
    ticket.validate()?;
    Ok(ticket)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let cfg = resolve_config(cli.config.as_deref())?;
    logging::init(&cfg.logging.level)?;

    match cli.command {
        Commands::Ingest { file } => {
            let services = Services::from_config(&cfg)?;
            let report = ingest_batch(&services.repository, &file).await;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::IngestTicket { file } => {
            let ticket = read_ticket(&file)?;
            let services = Services::from_config(&cfg)?;
            match ingest_one(&services.repository, &ticket).await {
                Ok(msg) => println!("{}", msg),
                Err(msg) => anyhow::bail!(msg),
            }
        }
        Commands::Similar { file } => {
            let ticket = read_ticket(&file)?;
            let services = Services::from_config(&cfg)?;
            let tickets = services.retrieval.retrieve_relevant(&ticket).await;
            println!("{}", serde_json::to_string_pretty(&tickets)?);
        }
        Commands::Augment { file } => {
            let ticket = read_ticket(&file)?;
            let services = Services::from_config(&cfg)?;
            let result = services.augment.augment(&ticket).await;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::Solve { file } => {
            let ticket = read_ticket(&file)?;
            let agent = agent_from_config(&cfg)?;
            println!("{}", agent.solve(&ticket).await?);
        }
        Commands::Serve { service } => match service {
            ServeService::Api => server::run_api_server(&cfg).await?,
            ServeService::Agent => server::run_agent_server(&cfg).await?,
        },
    }

    Ok(())
}
