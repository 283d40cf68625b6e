//! Error types with fix suggestions
//!
//! The graph and template algorithms themselves never throw for malformed
//! data; these errors belong to the boundaries around them (files, JSON,
//! lookups against the store).

use thiserror::Error;

/// Trait for errors that provide fix suggestions
pub trait FixSuggestion {
    fn fix_suggestion(&self) -> Option<&str>;
}

#[derive(Error, Debug)]
pub enum WeaveError {
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Flow '{flow_id}' not found")]
    FlowNotFound { flow_id: String },

    #[error("Agent '{agent_id}' is not defined in this flow")]
    AgentNotFound { agent_id: String },
}

impl FixSuggestion for WeaveError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            WeaveError::Json(_) => Some("Check the flow document is valid JSON (try jq)"),
            WeaveError::Io(_) => Some("Check file path and permissions"),
            WeaveError::FlowNotFound { .. } => Some("Verify the flow id exists in the store"),
            WeaveError::AgentNotFound { .. } => {
                Some("Add the agent to the flow's agents map, or fix the node's agentId")
            }
        }
    }
}
