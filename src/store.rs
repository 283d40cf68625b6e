//! Collaborator seams: flow persistence and the agent directory
//!
//! The engine never does I/O itself; these traits describe what it reads
//! from the surrounding application. The in-memory implementations back
//! tests and the CLI.

use std::collections::HashMap;

use crate::error::WeaveError;
use crate::flow::{AgentDefinition, Edge, Flow, Node};

/// Read-only access to persisted flows
pub trait FlowStore {
    fn load_nodes_by_flow(&self, flow_id: &str) -> Result<Vec<Node>, WeaveError>;
    fn load_edges_by_flow(&self, flow_id: &str) -> Result<Vec<Edge>, WeaveError>;
}

/// Lookup of agent definitions by sanitized identifier
pub trait AgentDirectory {
    fn resolve_agent_definition(&self, agent_id: &str) -> Option<AgentDefinition>;
}

/// In-memory flow store
#[derive(Default)]
pub struct MemoryStore {
    flows: HashMap<String, Flow>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, flow_id: impl Into<String>, flow: Flow) {
        self.flows.insert(flow_id.into(), flow);
    }

    pub fn get(&self, flow_id: &str) -> Option<&Flow> {
        self.flows.get(flow_id)
    }
}

impl FlowStore for MemoryStore {
    fn load_nodes_by_flow(&self, flow_id: &str) -> Result<Vec<Node>, WeaveError> {
        self.flows
            .get(flow_id)
            .map(|f| f.nodes.clone())
            .ok_or_else(|| WeaveError::FlowNotFound {
                flow_id: flow_id.to_string(),
            })
    }

    fn load_edges_by_flow(&self, flow_id: &str) -> Result<Vec<Edge>, WeaveError> {
        self.flows
            .get(flow_id)
            .map(|f| f.edges.clone())
            .ok_or_else(|| WeaveError::FlowNotFound {
                flow_id: flow_id.to_string(),
            })
    }
}

impl AgentDirectory for MemoryStore {
    /// Searches every stored flow; first definition wins.
    fn resolve_agent_definition(&self, agent_id: &str) -> Option<AgentDefinition> {
        self.flows
            .values()
            .find_map(|f| f.agents.get(agent_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_flow() -> MemoryStore {
        let flow = Flow::from_json(
            r#"{
            "nodes": [{"id": "start-1", "type": "start", "position": {"x": 0, "y": 0}}],
            "edges": [],
            "agents": {"alice": {"name": "Alice"}}
        }"#,
        )
        .unwrap();
        let mut store = MemoryStore::new();
        store.insert("f1", flow);
        store
    }

    #[test]
    fn load_by_flow_id() {
        let store = store_with_flow();
        assert_eq!(store.load_nodes_by_flow("f1").unwrap().len(), 1);
        assert!(store.load_edges_by_flow("f1").unwrap().is_empty());
    }

    #[test]
    fn unknown_flow_is_an_error() {
        let store = store_with_flow();
        let result = store.load_nodes_by_flow("missing");
        assert!(matches!(result, Err(WeaveError::FlowNotFound { .. })));
    }

    #[test]
    fn resolve_agent_definition_by_id() {
        let store = store_with_flow();
        assert_eq!(
            store.resolve_agent_definition("alice").unwrap().name,
            "Alice"
        );
        assert!(store.resolve_agent_definition("bob").is_none());
    }
}
