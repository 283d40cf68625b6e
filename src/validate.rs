//! Node and flow validation
//!
//! Structural integrity checks per node type, collected as data: the
//! validator never throws for malformed content, it returns errors and
//! warnings and lets the caller decide whether to block a save.

use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::color::is_hex_color;
use crate::flow::{Edge, Flow, IfData, Node, NodePayload, NodeType};
use crate::graph::FlowGraph;

/// Severity of a validation issue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// A single validation issue with context
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    // Node structure
    #[error("Node has an empty id")]
    EmptyNodeId,

    #[error("Duplicate node ID: '{id}'")]
    DuplicateNodeId { id: String },

    #[error("Node '{id}' has no position")]
    MissingPosition { id: String },

    // Agent nodes
    #[error("Agent node '{id}' has no agentId (node id will be used)")]
    MissingAgentId { id: String },

    // Data-store nodes
    #[error("Data-store node '{id}' has no dataStoreFields array")]
    MissingDataStoreFields { id: String },

    #[error("Data-store node '{id}' field #{index} has no schemaFieldId")]
    MissingSchemaFieldId { id: String, index: usize },

    #[error("Data-store node '{id}' field '{field}' has no value")]
    MissingFieldValue { id: String, field: String },

    #[error("Node '{id}' has a malformed color '{color}'")]
    InvalidColor { id: String, color: String },

    // If nodes
    #[error("If node '{id}' has invalid logicOperator '{operator}' (expected AND or OR)")]
    InvalidLogicOperator { id: String, operator: String },

    #[error("If node '{id}' has no conditions array")]
    MissingConditions { id: String },

    #[error("If node '{id}' condition #{index} has no id")]
    MissingConditionId { id: String, index: usize },

    // Edges
    #[error("Edge '{edge_id}' source '{source}' does not exist")]
    EdgeSourceNotFound { edge_id: String, source: String },

    #[error("Edge '{edge_id}' target '{target}' does not exist")]
    EdgeTargetNotFound { edge_id: String, target: String },

    // Graph shape
    #[error("Flow has no start node")]
    MissingStartNode,

    #[error("Flow has no end node")]
    MissingEndNode,

    #[error("Node '{id}' has no connections")]
    OrphanNode { id: String },

    #[error("Node '{id}' is not reachable from the start node")]
    UnreachableNode { id: String },

    #[error("Cycle detected: {path}")]
    CycleDetected { path: String },
}

impl ValidationError {
    /// Get severity (error vs warning)
    pub fn severity(&self) -> Severity {
        match self {
            ValidationError::MissingAgentId { .. }
            | ValidationError::MissingFieldValue { .. }
            | ValidationError::InvalidColor { .. }
            | ValidationError::MissingStartNode
            | ValidationError::MissingEndNode
            | ValidationError::OrphanNode { .. }
            | ValidationError::UnreachableNode { .. }
            | ValidationError::CycleDetected { .. } => Severity::Warning,
            _ => Severity::Error,
        }
    }

    /// Get suggestion for fixing this issue
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            ValidationError::DuplicateNodeId { .. } => {
                Some("Give every node a unique id before saving")
            }
            ValidationError::MissingAgentId { .. } => {
                Some("Pick an agent in the node inspector, or keep the node id as the agent name")
            }
            ValidationError::InvalidColor { .. } => {
                Some("Use a 6-digit hex color like #8A2BE2")
            }
            ValidationError::InvalidLogicOperator { .. } => Some("Use AND or OR"),
            ValidationError::EdgeSourceNotFound { .. }
            | ValidationError::EdgeTargetNotFound { .. } => {
                Some("Delete the edge or reconnect it to an existing node")
            }
            ValidationError::CycleDetected { .. } => {
                Some("Break the loop: agent order is undefined inside a cycle")
            }
            _ => None,
        }
    }
}

/// Result of validating a node or a whole flow
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationError>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn add(&mut self, issue: ValidationError) {
        if issue.severity() == Severity::Warning {
            self.warnings.push(issue);
        } else {
            self.errors.push(issue);
        }
    }

    pub fn merge(&mut self, other: ValidationResult) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }
}

/// Validate one node's payload against its type
pub fn validate_node(node: &Node) -> ValidationResult {
    let mut result = ValidationResult::new();

    if node.id.is_empty() {
        result.add(ValidationError::EmptyNodeId);
    }
    if node.position.is_none() {
        result.add(ValidationError::MissingPosition {
            id: node.id.clone(),
        });
    }

    match &node.payload {
        NodePayload::Start | NodePayload::End => {}
        NodePayload::Agent(data) => {
            if data.agent_id.is_none() {
                result.add(ValidationError::MissingAgentId {
                    id: node.id.clone(),
                });
            }
        }
        NodePayload::DataStore(data) => {
            if let Some(color) = &data.color {
                if !is_hex_color(color) {
                    result.add(ValidationError::InvalidColor {
                        id: node.id.clone(),
                        color: color.clone(),
                    });
                }
            }
            match &data.data_store_fields {
                None => result.add(ValidationError::MissingDataStoreFields {
                    id: node.id.clone(),
                }),
                Some(fields) => {
                    for (index, field) in fields.iter().enumerate() {
                        match &field.schema_field_id {
                            None => result.add(ValidationError::MissingSchemaFieldId {
                                id: node.id.clone(),
                                index,
                            }),
                            Some(schema_field_id) if field.value.is_none() => {
                                result.add(ValidationError::MissingFieldValue {
                                    id: node.id.clone(),
                                    field: schema_field_id.clone(),
                                });
                            }
                            Some(_) => {}
                        }
                    }
                }
            }
        }
        NodePayload::If(data) => validate_if_node(&node.id, data, &mut result),
    }

    result
}

fn validate_if_node(id: &str, data: &IfData, result: &mut ValidationResult) {
    if let Some(operator) = &data.logic_operator {
        if operator != "AND" && operator != "OR" {
            result.add(ValidationError::InvalidLogicOperator {
                id: id.to_string(),
                operator: operator.clone(),
            });
        }
    }

    if let Some(color) = &data.color {
        if !is_hex_color(color) {
            result.add(ValidationError::InvalidColor {
                id: id.to_string(),
                color: color.clone(),
            });
        }
    }

    match &data.conditions {
        None => result.add(ValidationError::MissingConditions { id: id.to_string() }),
        Some(conditions) => {
            for (index, condition) in conditions.iter().enumerate() {
                // operator: null is a legitimate mid-creation state
                if condition.id.is_none() {
                    result.add(ValidationError::MissingConditionId {
                        id: id.to_string(),
                        index,
                    });
                }
            }
        }
    }
}

/// Validate a node list: duplicate ids across the whole set, then each node
pub fn validate_all_nodes(nodes: &[Node]) -> ValidationResult {
    let mut result = ValidationResult::new();

    let mut seen: HashSet<&str> = HashSet::new();
    let mut reported: HashSet<&str> = HashSet::new();
    for node in nodes {
        if !seen.insert(&node.id) && reported.insert(&node.id) {
            result.add(ValidationError::DuplicateNodeId {
                id: node.id.clone(),
            });
        }
    }

    for node in nodes {
        result.merge(validate_node(node));
    }

    result
}

/// Validate a whole flow: node payloads, edge references, and graph shape
pub fn validate_flow(flow: &Flow) -> ValidationResult {
    let mut result = validate_all_nodes(&flow.nodes);

    let node_ids: HashSet<&str> = flow.node_ids().collect();
    for edge in &flow.edges {
        if !node_ids.contains(edge.source.as_str()) {
            result.add(ValidationError::EdgeSourceNotFound {
                edge_id: edge.id.clone(),
                source: edge.source.clone(),
            });
        }
        if !node_ids.contains(edge.target.as_str()) {
            result.add(ValidationError::EdgeTargetNotFound {
                edge_id: edge.id.clone(),
                target: edge.target.clone(),
            });
        }
    }

    validate_graph(flow, &mut result);

    result
}

/// Graph-shape warnings: missing start/end, orphans, unreachable nodes,
/// and cycles. All advisory; traversal tolerates every one of them.
fn validate_graph(flow: &Flow, result: &mut ValidationResult) {
    if flow.nodes.is_empty() {
        return;
    }

    let start = flow.start_node();
    if start.is_none() {
        result.add(ValidationError::MissingStartNode);
    }
    if flow.end_node().is_none() {
        result.add(ValidationError::MissingEndNode);
    }

    let graph = FlowGraph::build(&flow.nodes, &flow.edges);

    for node in &flow.nodes {
        if graph.successors(&node.id).is_empty() && graph.predecessors(&node.id).is_empty() {
            result.add(ValidationError::OrphanNode {
                id: node.id.clone(),
            });
        }
    }

    if let Some(start) = start {
        let mut reachable: HashSet<&str> = HashSet::new();
        let mut stack: Vec<&str> = vec![&start.id];
        while let Some(current) = stack.pop() {
            if !reachable.insert(current) {
                continue;
            }
            for neighbor in graph.successors(current) {
                if !reachable.contains(neighbor.as_ref()) {
                    stack.push(neighbor.as_ref());
                }
            }
        }
        for node in &flow.nodes {
            if node.node_type() != NodeType::End && !reachable.contains(node.id.as_str()) {
                result.add(ValidationError::UnreachableNode {
                    id: node.id.clone(),
                });
            }
        }
    }

    if let Some(path) = find_cycle(&flow.nodes, &flow.edges) {
        result.add(ValidationError::CycleDetected { path });
    }
}

/// DFS with a recursion stack; reports the first cycle found as a path
/// string like `a → b → a`.
fn find_cycle(nodes: &[Node], edges: &[Edge]) -> Option<String> {
    let mut outgoing: HashMap<&str, Vec<&str>> = HashMap::new();
    for node in nodes {
        outgoing.entry(node.id.as_str()).or_default();
    }
    for edge in edges {
        outgoing
            .entry(edge.source.as_str())
            .or_default()
            .push(edge.target.as_str());
    }

    fn visit<'a>(
        node: &'a str,
        outgoing: &HashMap<&'a str, Vec<&'a str>>,
        visited: &mut HashSet<&'a str>,
        rec_stack: &mut HashSet<&'a str>,
        path: &mut Vec<&'a str>,
    ) -> Option<String> {
        visited.insert(node);
        rec_stack.insert(node);
        path.push(node);

        if let Some(neighbors) = outgoing.get(node) {
            for neighbor in neighbors {
                if !visited.contains(*neighbor) {
                    if let Some(cycle) = visit(neighbor, outgoing, visited, rec_stack, path) {
                        return Some(cycle);
                    }
                } else if rec_stack.contains(*neighbor) {
                    let cycle_start = path.iter().position(|&n| n == *neighbor).unwrap();
                    let cycle_nodes: Vec<&str> = path[cycle_start..].to_vec();
                    return Some(format!("{} → {}", cycle_nodes.join(" → "), neighbor));
                }
            }
        }

        rec_stack.remove(node);
        path.pop();
        None
    }

    let mut visited = HashSet::new();
    let mut rec_stack = HashSet::new();
    let mut path = Vec::new();

    for node in nodes {
        if !visited.contains(node.id.as_str()) {
            if let Some(cycle) = visit(
                node.id.as_str(),
                &outgoing,
                &mut visited,
                &mut rec_stack,
                &mut path,
            ) {
                return Some(cycle);
            }
        }
    }

    None
}
