//! Best-effort node repair
//!
//! Fills gaps in half-built node payloads so downstream code can rely on
//! arrays and defaults being present. Repair only fills, it never removes
//! or overwrites data the user already entered, and it never fails.

use tracing::warn;

use crate::flow::{Node, NodePayload, Point};

/// Default logic operator for if nodes created before the user picked one
const DEFAULT_LOGIC_OPERATOR: &str = "AND";

/// Repair a node in place and return it. Idempotent: repairing an already
/// repaired node changes nothing.
pub fn repair_node(mut node: Node) -> Node {
    if node.position.is_none() {
        node.position = Some(Point::default());
    }

    let node_id = node.id.clone();
    match &mut node.payload {
        NodePayload::Start | NodePayload::End => {}
        NodePayload::Agent(data) => {
            // The correct identifier cannot be inferred, so this stays
            // unrepaired; traversal falls back to the node id.
            if data.agent_id.is_none() {
                warn!(node = %node_id, "agent node has no agentId, leaving as-is");
            }
        }
        NodePayload::DataStore(data) => {
            if data.label.is_none() {
                data.label = Some("Data store".to_string());
            }
            if data.data_store_fields.is_none() {
                data.data_store_fields = Some(Vec::new());
            }
        }
        NodePayload::If(data) => {
            if data.label.is_none() {
                data.label = Some("Condition".to_string());
            }
            if data.logic_operator.is_none() {
                data.logic_operator = Some(DEFAULT_LOGIC_OPERATOR.to_string());
            }
            if data.conditions.is_none() {
                data.conditions = Some(Vec::new());
            }
        }
    }

    node
}
