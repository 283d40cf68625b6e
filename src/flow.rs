//! Flow document structures
//!
//! A Flow is the directed graph of typed nodes and edges behind one agent
//! pipeline, parsed from the editor's JSON document. Node payloads are a
//! tagged union keyed by the document's `type` field; scalar fields stay
//! permissive (Options) so half-built documents parse and flow through to
//! validation instead of failing at the boundary.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::template::replace_agent_references;

/// 2D canvas position of a node
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Node type discriminant (matches the document's `type` field)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeType {
    Start,
    End,
    Agent,
    If,
    DataStore,
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeType::Start => write!(f, "start"),
            NodeType::End => write!(f, "end"),
            NodeType::Agent => write!(f, "agent"),
            NodeType::If => write!(f, "if"),
            NodeType::DataStore => write!(f, "dataStore"),
        }
    }
}

/// Agent node payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
}

/// Data-store node payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataStoreData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_store_fields: Option<Vec<DataStoreField>>,
}

/// One field binding inside a data-store node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataStoreField {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_field_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

/// Conditional node payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IfData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logic_operator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Vec<IfCondition>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// One comparison inside an if node
///
/// `operator` may legitimately be null while the user is still picking one
/// in the editor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IfCondition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub operator: Option<String>,
}

/// Type-specific node payload
#[derive(Debug, Clone, PartialEq)]
pub enum NodePayload {
    Start,
    End,
    Agent(AgentData),
    If(IfData),
    DataStore(DataStoreData),
}

/// A single node in a flow graph
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: String,
    pub position: Option<Point>,
    pub payload: NodePayload,
}

impl Node {
    pub fn node_type(&self) -> NodeType {
        match self.payload {
            NodePayload::Start => NodeType::Start,
            NodePayload::End => NodeType::End,
            NodePayload::Agent(_) => NodeType::Agent,
            NodePayload::If(_) => NodeType::If,
            NodePayload::DataStore(_) => NodeType::DataStore,
        }
    }

    /// Effective agent identifier: explicit `agentId`, else the node's own id
    /// (backward compatibility with documents written before `agentId`).
    /// `None` for non-agent nodes.
    pub fn agent_id(&self) -> Option<&str> {
        match &self.payload {
            NodePayload::Agent(data) => Some(data.agent_id.as_deref().unwrap_or(&self.id)),
            _ => None,
        }
    }
}

/// Raw wire shape of a node: `{ id, type, position, data }`
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NodeRaw {
    id: String,
    #[serde(rename = "type")]
    node_type: NodeType,
    #[serde(default)]
    position: Option<Point>,
    #[serde(default)]
    data: Option<Value>,
}

impl<'de> Deserialize<'de> for Node {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::Error;

        let raw = NodeRaw::deserialize(deserializer)?;
        // Missing or null data parses as an empty payload; repair fills the
        // gaps later. Ill-typed fields (non-string agentId etc.) are schema
        // errors and fail here.
        let data = match raw.data {
            Some(Value::Null) | None => Value::Object(Default::default()),
            Some(v) => v,
        };
        let payload = match raw.node_type {
            NodeType::Start => NodePayload::Start,
            NodeType::End => NodePayload::End,
            NodeType::Agent => {
                NodePayload::Agent(serde_json::from_value(data).map_err(D::Error::custom)?)
            }
            NodeType::If => {
                NodePayload::If(serde_json::from_value(data).map_err(D::Error::custom)?)
            }
            NodeType::DataStore => {
                NodePayload::DataStore(serde_json::from_value(data).map_err(D::Error::custom)?)
            }
        };

        Ok(Node {
            id: raw.id,
            position: raw.position,
            payload,
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NodeOut<'a> {
    id: &'a str,
    #[serde(rename = "type")]
    node_type: NodeType,
    #[serde(skip_serializing_if = "Option::is_none")]
    position: Option<Point>,
    data: Value,
}

impl Serialize for Node {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::Error;

        let data = match &self.payload {
            NodePayload::Start | NodePayload::End => Value::Object(Default::default()),
            NodePayload::Agent(d) => serde_json::to_value(d).map_err(S::Error::custom)?,
            NodePayload::If(d) => serde_json::to_value(d).map_err(S::Error::custom)?,
            NodePayload::DataStore(d) => serde_json::to_value(d).map_err(S::Error::custom)?,
        };

        NodeOut {
            id: &self.id,
            node_type: self.node_type(),
            position: self.position,
            data,
        }
        .serialize(serializer)
    }
}

/// A directed edge between two nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Agent definition referenced by agent nodes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentDefinition {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_template: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// A complete flow document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flow {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub response_template: String,
    #[serde(default)]
    pub agents: HashMap<String, AgentDefinition>,
}

impl Flow {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn get_node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn node_ids(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(|n| n.id.as_str())
    }

    /// First start node in document order, if any
    pub fn start_node(&self) -> Option<&Node> {
        self.nodes
            .iter()
            .find(|n| n.node_type() == NodeType::Start)
    }

    /// First end node in document order, if any
    pub fn end_node(&self) -> Option<&Node> {
        self.nodes.iter().find(|n| n.node_type() == NodeType::End)
    }

    pub fn agent_nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes
            .iter()
            .filter(|n| n.node_type() == NodeType::Agent)
    }

    /// Rename an agent identifier across the whole document: node payloads,
    /// the agent map key, and every template that references the old name.
    pub fn rename_agent(&mut self, old: &str, new: &str) {
        for node in &mut self.nodes {
            if let NodePayload::Agent(data) = &mut node.payload {
                if data.agent_id.as_deref() == Some(old) {
                    data.agent_id = Some(new.to_string());
                }
            }
        }

        if let Some(def) = self.agents.remove(old) {
            self.agents.insert(new.to_string(), def);
        }

        for def in self.agents.values_mut() {
            if let Some(prompt) = &def.prompt_template {
                def.prompt_template = Some(replace_agent_references(prompt, old, new));
            }
        }

        self.response_template = replace_agent_references(&self.response_template, old, new);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FLOW_JSON: &str = r#"{
        "nodes": [
            {"id": "start-1", "type": "start", "position": {"x": 0, "y": 0}},
            {"id": "n1", "type": "agent", "position": {"x": 100, "y": 0}, "data": {"agentId": "alice"}},
            {"id": "n2", "type": "agent", "position": {"x": 200, "y": 0}},
            {"id": "end-1", "type": "end", "position": {"x": 300, "y": 0}}
        ],
        "edges": [
            {"id": "e1", "source": "start-1", "target": "n1"},
            {"id": "e2", "source": "n1", "target": "n2"},
            {"id": "e3", "source": "n2", "target": "end-1"}
        ],
        "responseTemplate": "{{alice.reply}}",
        "agents": {
            "alice": {"name": "Alice", "promptTemplate": "You are {{alice}}."}
        }
    }"#;

    #[test]
    fn parse_flow_document() {
        let flow = Flow::from_json(FLOW_JSON).unwrap();
        assert_eq!(flow.nodes.len(), 4);
        assert_eq!(flow.edges.len(), 3);
        assert_eq!(flow.response_template, "{{alice.reply}}");
        assert!(flow.agents.contains_key("alice"));
    }

    #[test]
    fn agent_id_fallback_to_node_id() {
        let flow = Flow::from_json(FLOW_JSON).unwrap();
        assert_eq!(flow.get_node("n1").unwrap().agent_id(), Some("alice"));
        // No explicit agentId: node id is the agent identifier
        assert_eq!(flow.get_node("n2").unwrap().agent_id(), Some("n2"));
        assert_eq!(flow.get_node("start-1").unwrap().agent_id(), None);
    }

    #[test]
    fn node_without_data_parses_empty_payload() {
        let node: Node =
            serde_json::from_str(r#"{"id": "a", "type": "agent", "position": {"x": 0, "y": 0}}"#)
                .unwrap();
        assert_eq!(node.payload, NodePayload::Agent(AgentData::default()));
    }

    #[test]
    fn node_with_null_data_parses_empty_payload() {
        let node: Node =
            serde_json::from_str(r#"{"id": "a", "type": "if", "data": null}"#).unwrap();
        assert_eq!(node.payload, NodePayload::If(IfData::default()));
        assert!(node.position.is_none());
    }

    #[test]
    fn ill_typed_agent_id_is_a_schema_error() {
        let result: Result<Node, _> =
            serde_json::from_str(r#"{"id": "a", "type": "agent", "data": {"agentId": 42}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn node_roundtrip() {
        let flow = Flow::from_json(FLOW_JSON).unwrap();
        let json = flow.to_json().unwrap();
        let reparsed = Flow::from_json(&json).unwrap();
        assert_eq!(flow, reparsed);
    }

    #[test]
    fn rename_agent_propagates_everywhere() {
        let mut flow = Flow::from_json(FLOW_JSON).unwrap();
        flow.rename_agent("alice", "bob");

        assert_eq!(flow.get_node("n1").unwrap().agent_id(), Some("bob"));
        assert!(flow.agents.contains_key("bob"));
        assert!(!flow.agents.contains_key("alice"));
        assert_eq!(flow.response_template, "{{bob.reply}}");
        assert_eq!(
            flow.agents["bob"].prompt_template.as_deref(),
            Some("You are {{bob}}.")
        );
    }

    #[test]
    fn if_condition_operator_null_is_tolerated() {
        let node: Node = serde_json::from_str(
            r#"{"id": "cond", "type": "if", "position": {"x": 0, "y": 0},
                "data": {"logicOperator": "AND", "conditions": [{"id": "c1", "operator": null}]}}"#,
        )
        .unwrap();
        match node.payload {
            NodePayload::If(data) => {
                let conditions = data.conditions.unwrap();
                assert_eq!(conditions[0].id.as_deref(), Some("c1"));
                assert!(conditions[0].operator.is_none());
            }
            other => panic!("Expected if payload, got {:?}", other),
        }
    }
}
