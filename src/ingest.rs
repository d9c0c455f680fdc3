//! Ingestion pipeline.
//!
//! Loads tickets (one at a time or as a JSON array file), validates them,
//! and pushes their fragments into the [`TicketRepository`].
//!
//! Batch loading is all-or-nothing on shape: if any entry of the array fails
//! to parse as a ticket, nothing is loaded. Once loaded, each ticket is
//! validated and stored independently, so an empty id, a bad `creationDate`
//! or a short description fails only that ticket.

use serde::Serialize;
use std::path::Path;
use tracing::{error, info, warn};

use crate::error::ValidationError;
use crate::models::Ticket;
use crate::repository::TicketRepository;

/// Summary of a batch ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    /// Tickets parsed from the file.
    pub loaded: usize,
    /// Tickets stored successfully.
    pub ingested: usize,
    /// Tickets that failed validation or storage.
    pub failed: usize,
    /// Fragments written across all stored tickets.
    pub fragments: usize,
}

/// Ingest a single ticket and describe the outcome.
///
/// `Ok` carries a success message; `Err` carries a message starting with
/// `ERROR` that names the ticket.
pub async fn ingest_one(repo: &TicketRepository, ticket: &Ticket) -> Result<String, String> {
    let min = repo.min_description_chars();
    if ticket.description_len() < min {
        warn!(ticket_id = %ticket.ticket_id, "description too short, not ingested");
        return Err(format!(
            "ERROR: The description of ticket {} is too short.",
            ticket.ticket_id
        ));
    }

    match repo.store(ticket).await {
        Ok(fragments) => {
            info!(ticket_id = %ticket.ticket_id, fragments, "ticket ingested");
            Ok(format!("Ticket {} ingested successfully.", ticket.ticket_id))
        }
        Err(e) => {
            error!(ticket_id = %ticket.ticket_id, error = %e, "ticket ingestion failed");
            Err(format!("ERROR ingesting ticket {}: {}", ticket.ticket_id, e))
        }
    }
}

/// Parse a JSON array of tickets. Field values are not validated here.
pub fn parse_tickets(content: &str) -> Result<Vec<Ticket>, ValidationError> {
    Ok(serde_json::from_str(content)?)
}

/// Load tickets from a JSON array file.
///
/// Any read or parse error yields an empty list (logged).
pub fn load_tickets(path: &Path) -> Vec<Ticket> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            error!(path = %path.display(), error = %e, "failed to read ticket file");
            return Vec::new();
        }
    };

    match parse_tickets(&content) {
        Ok(tickets) => tickets,
        Err(e) => {
            error!(path = %path.display(), error = %e, "ticket file rejected, nothing loaded");
            Vec::new()
        }
    }
}

/// Validate and store each ticket, logging and counting per-ticket failures.
pub async fn ingest_tickets(repo: &TicketRepository, tickets: &[Ticket]) -> BatchReport {
    let mut report = BatchReport {
        loaded: tickets.len(),
        ..Default::default()
    };

    for ticket in tickets {
        if let Err(e) = ticket.validate() {
            warn!(ticket_id = %ticket.ticket_id, error = %e, "skipping invalid ticket");
            report.failed += 1;
            continue;
        }
        match repo.store(ticket).await {
            Ok(n) => {
                report.ingested += 1;
                report.fragments += n;
            }
            Err(e) => {
                warn!(ticket_id = %ticket.ticket_id, error = %e, "skipping ticket");
                report.failed += 1;
            }
        }
    }

    info!(
        loaded = report.loaded,
        ingested = report.ingested,
        failed = report.failed,
        fragments = report.fragments,
        "batch ingestion finished"
    );
    report
}

/// Load a ticket file and ingest everything in it.
pub async fn ingest_batch(repo: &TicketRepository, path: &Path) -> BatchReport {
    let tickets = load_tickets(path);
    ingest_tickets(repo, &tickets).await
}
