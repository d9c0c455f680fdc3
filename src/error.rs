//! Typed error taxonomy.
//!
//! Retrieval and augmentation are best-effort: most of these errors are
//! logged and converted to a degraded output before reaching a caller.
//! Only validation failures surface to users as explicit errors.

use thiserror::Error;

/// A ticket (or ticket file) failed validation.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("ticket id must not be empty")]
    EmptyTicketId,

    #[error("ticket {ticket_id} has invalid creation date '{value}' (expected YYYY-MM-DD)")]
    InvalidDate { ticket_id: String, value: String },

    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    #[error("malformed ticket JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Storage or lookup failure in the vector-store collaborator.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("description of ticket {ticket_id} is too short ({len} < {min} characters)")]
    DescriptionTooShort {
        ticket_id: String,
        len: usize,
        min: usize,
    },

    #[error("embedding failed: {0}")]
    Embedding(String),

    #[error("vector store unavailable: {0}")]
    Unavailable(String),

    #[error("vector store error: {0}")]
    Backend(String),

    #[error("mismatched batch: {texts} texts, {metadatas} metadatas, {ids} ids")]
    MismatchedBatch {
        texts: usize,
        metadatas: usize,
        ids: usize,
    },
}

/// Network or protocol failure in a model or search provider.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("unexpected response: {0}")]
    Response(String),

    #[error("{0} is not configured")]
    NotConfigured(String),
}

impl From<reqwest::Error> for UpstreamError {
    fn from(e: reqwest::Error) -> Self {
        UpstreamError::Request(e.to_string())
    }
}

/// Failure of the resolution agent.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("ticket has no description")]
    EmptyDescription,

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error("agent did not produce a final answer within {0} steps")]
    StepLimit(usize),
}

/// Failure of the news summarizer.
#[derive(Debug, Error)]
pub enum NewsError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error("failed to generate summary: {0}")]
    Upstream(#[from] UpstreamError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_description_too_short_names_ticket() {
        let e = StoreError::DescriptionTooShort {
            ticket_id: "HW-7".into(),
            len: 3,
            min: 5,
        };
        assert!(e.to_string().contains("HW-7"));
        assert!(e.to_string().contains("3 < 5"));
    }

    #[test]
    fn test_json_error_converts() {
        let err = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        let e: ValidationError = err.into();
        assert!(e.to_string().starts_with("malformed ticket JSON"));
    }

    #[test]
    fn test_agent_error_wraps_upstream() {
        let e: AgentError = UpstreamError::NotConfigured("web search".into()).into();
        assert_eq!(e.to_string(), "web search is not configured");
    }
}
