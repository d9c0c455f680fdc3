//! Core data models used throughout Ticket Harness.
//!
//! These types represent the tickets, fragments, and augmentation results
//! that flow through the ingestion and retrieval pipeline. Wire names match
//! the JSON accepted by the HTTP API (`ticketId`, `creationDate`, ...).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ValidationError;

/// Ticket priority, serialized with its capitalized name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TicketPriority {
    Low,
    Medium,
    High,
    Urgent,
}

impl fmt::Display for TicketPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TicketPriority::Low => "Low",
            TicketPriority::Medium => "Medium",
            TicketPriority::High => "High",
            TicketPriority::Urgent => "Urgent",
        };
        f.write_str(s)
    }
}

/// A support ticket.
///
/// Every field is required on the wire. The `description` drives chunking
/// and similarity search; the whole ticket is stored as fragment metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    /// Unique ticket identifier (e.g. `SOFT-20251211-001`).
    pub ticket_id: String,
    /// Creation date in `YYYY-MM-DD` form.
    pub creation_date: String,
    pub priority: TicketPriority,
    /// Requester name and department.
    pub owner: String,
    /// Free-text problem description.
    pub description: String,
    /// Impact of the problem on productivity.
    pub impact: String,
    /// Actions the requester took before reporting.
    pub actions: String,
}

impl Ticket {
    /// Length of the description in characters (not bytes).
    pub fn description_len(&self) -> usize {
        self.description.chars().count()
    }

    /// Parsed creation date, if it is a valid `YYYY-MM-DD` string.
    pub fn creation_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.creation_date, "%Y-%m-%d").ok()
    }

    /// Check the structural invariants that serde cannot express:
    /// a non-empty `ticketId` and a well-formed `creationDate`.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.ticket_id.trim().is_empty() {
            return Err(ValidationError::EmptyTicketId);
        }
        if self.creation_date().is_none() {
            return Err(ValidationError::InvalidDate {
                ticket_id: self.ticket_id.clone(),
                value: self.creation_date.clone(),
            });
        }
        Ok(())
    }

    /// Serialize the ticket as a JSON object for use as fragment metadata.
    pub fn to_metadata(&self) -> serde_json::Value {
        serde_json::json!({
            "ticketId": self.ticket_id,
            "creationDate": self.creation_date,
            "priority": self.priority,
            "owner": self.owner,
            "description": self.description,
            "impact": self.impact,
            "actions": self.actions,
        })
    }

    /// Rebuild a ticket from fragment metadata.
    ///
    /// Extra keys (such as the fragment `text` some stores keep alongside
    /// the metadata) are ignored.
    pub fn from_metadata(metadata: &serde_json::Value) -> Result<Self, serde_json::Error> {
        Ticket::deserialize(metadata)
    }
}

/// Build the deterministic fragment ID `"{ticket_id}_{index}"`.
pub fn fragment_id(ticket_id: &str, index: usize) -> String {
    format!("{}_{}", ticket_id, index)
}

/// A stored unit of a ticket: one slice of its description plus the full
/// ticket as metadata.
#[derive(Debug, Clone)]
pub struct TicketFragment {
    pub id: String,
    pub index: usize,
    pub text: String,
    pub metadata: serde_json::Value,
}

/// Structured answer produced by the augmentation service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AugmentationResult {
    pub summary: String,
    /// Deduplicated owners of the retrieved tickets, in rank order.
    pub contacts: Vec<String>,
}

impl AugmentationResult {
    /// The fixed answer returned when retrieval finds nothing.
    pub fn no_similar_tickets() -> Self {
        Self {
            summary: "No similar tickets found".to_string(),
            contacts: Vec::new(),
        }
    }
}
