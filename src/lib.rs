//! Weave - flow graph orchestration engine for agent pipelines

pub mod cache;
pub mod color;
pub mod error;
pub mod flow;
pub mod graph;
pub mod repair;
pub mod store;
pub mod template;
pub mod traversal;
pub mod validate;

pub use cache::TraversalCache;
pub use error::{FixSuggestion, WeaveError};
pub use flow::{
    AgentData, AgentDefinition, DataStoreData, DataStoreField, Edge, Flow, IfCondition, IfData,
    Node, NodePayload, NodeType, Point,
};
pub use graph::FlowGraph;
pub use repair::repair_node;
pub use store::{AgentDirectory, FlowStore, MemoryStore};
pub use template::{
    extract_agent_variables, extract_variables, has_agent_references, replace_agent_references,
    sanitize_agent_name,
};
pub use traversal::{traverse_flow, AgentPosition, FlowTraversalResult};
pub use validate::{
    validate_all_nodes, validate_flow, validate_node, Severity, ValidationError, ValidationResult,
};
