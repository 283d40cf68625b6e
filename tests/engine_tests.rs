//! # Engine Integration Tests
//!
//! End-to-end tests over the library surface:
//! - validate → repair → traverse pipeline on realistic flow documents
//! - ordering guarantees (determinism, depth, tie-breaks)
//! - template extraction feeding the rename workflow

use std::sync::Arc;

use weave::{
    extract_agent_variables, repair_node, traverse_flow, validate_flow, validate_node, Flow,
    TraversalCache,
};

// ============================================================================
// TEST HELPERS
// ============================================================================

/// A session flow the editor could plausibly produce: a narrator fans out
/// to two specialists that both feed a judge, which reaches the end node.
/// One agent was disconnected by the user and a data-store node sits on a
/// side branch.
fn make_session_flow() -> Flow {
    let json = r#"{
        "nodes": [
            {"id": "start-1", "type": "start", "position": {"x": 0, "y": 100}},
            {"id": "narrator-node", "type": "agent", "position": {"x": 150, "y": 100},
             "data": {"agentId": "narrator"}},
            {"id": "gate-1", "type": "if", "position": {"x": 300, "y": 100},
             "data": {"label": "Mood gate", "logicOperator": "AND",
                      "conditions": [{"id": "c1", "operator": "equals"}]}},
            {"id": "poet-node", "type": "agent", "position": {"x": 450, "y": 50},
             "data": {"agentId": "poet"}},
            {"id": "chronicler-node", "type": "agent", "position": {"x": 450, "y": 150},
             "data": {"agentId": "chronicler"}},
            {"id": "mem-1", "type": "dataStore", "position": {"x": 450, "y": 250},
             "data": {"label": "Memories", "color": "#3FB950",
                      "dataStoreFields": [{"schemaFieldId": "mood", "value": "calm"}]}},
            {"id": "judge-node", "type": "agent", "position": {"x": 600, "y": 100},
             "data": {"agentId": "judge"}},
            {"id": "loner-node", "type": "agent", "position": {"x": 150, "y": 300},
             "data": {"agentId": "loner"}},
            {"id": "end-1", "type": "end", "position": {"x": 750, "y": 100}}
        ],
        "edges": [
            {"id": "e1", "source": "start-1", "target": "narrator-node"},
            {"id": "e2", "source": "narrator-node", "target": "gate-1"},
            {"id": "e3", "source": "gate-1", "target": "poet-node", "label": "true"},
            {"id": "e4", "source": "gate-1", "target": "chronicler-node", "label": "false"},
            {"id": "e5", "source": "gate-1", "target": "mem-1"},
            {"id": "e6", "source": "poet-node", "target": "judge-node"},
            {"id": "e7", "source": "chronicler-node", "target": "judge-node"},
            {"id": "e8", "source": "judge-node", "target": "end-1"}
        ],
        "responseTemplate": "{{judge.verdict}}",
        "agents": {
            "narrator": {"name": "Narrator", "promptTemplate": "Set the scene for {{card.title}}."},
            "poet": {"name": "Poet", "promptTemplate": "Answer {{narrator}} in verse."},
            "chronicler": {"name": "Chronicler", "promptTemplate": "Record {{narrator.reply}}."},
            "judge": {"name": "Judge", "promptTemplate": "Pick between {{poet.reply}} and {{chronicler.reply}}."},
            "loner": {"name": "Loner"}
        }
    }"#;
    Flow::from_json(json).unwrap()
}

// ============================================================================
// VALIDATE → TRAVERSE PIPELINE
// ============================================================================

#[test]
fn session_flow_validates_cleanly_except_the_disconnected_agent() {
    let flow = make_session_flow();
    let result = validate_flow(&flow);

    assert!(result.is_valid(), "unexpected errors: {:?}", result.errors);
    // loner-node has no edges: orphan + unreachable warnings, nothing else
    assert!(result
        .warnings
        .iter()
        .all(|w| w.to_string().contains("loner-node")));
}

#[test]
fn session_flow_orders_agents_by_depth_then_name() {
    let flow = make_session_flow();
    let result = traverse_flow(&flow);

    assert!(result.has_valid_flow);

    // narrator (depth 1) first; poet and chronicler share depth 3 and fall
    // back to identifier order; judge (depth 4) last; loner disconnected.
    let order: Vec<&str> = result.execution_order().collect();
    assert_eq!(order, vec!["narrator", "chronicler", "poet", "judge"]);

    let chronicler = result.get("chronicler").unwrap();
    let poet = result.get("poet").unwrap();
    assert_eq!(chronicler.depth, poet.depth);
    assert!(chronicler.position < poet.position);

    let loner = result.get("loner").unwrap();
    assert_eq!(loner.position, -1);
    assert_eq!(loner.depth, -1);
}

#[test]
fn depth_counts_every_hop_including_non_agent_nodes() {
    let flow = make_session_flow();
    let result = traverse_flow(&flow);

    // start → narrator = 1, → gate → poet = 3, → judge = 4
    assert_eq!(result.get("narrator").unwrap().depth, 1);
    assert_eq!(result.get("poet").unwrap().depth, 3);
    assert_eq!(result.get("judge").unwrap().depth, 4);
}

#[test]
fn repeated_traversal_is_byte_identical() {
    let flow = make_session_flow();
    let first = serde_json::to_string(&traverse_flow(&flow)).unwrap();
    for _ in 0..5 {
        assert_eq!(first, serde_json::to_string(&traverse_flow(&flow)).unwrap());
    }
}

#[test]
fn cached_traversal_shares_one_snapshot() {
    let flow = make_session_flow();
    let cache = TraversalCache::new();
    let a = cache.traverse(&flow);
    let b = cache.traverse(&flow);
    assert!(Arc::ptr_eq(&a, &b));
}

#[test]
fn deleting_an_edge_disconnects_downstream_agents() {
    let mut flow = make_session_flow();
    // Cut narrator → gate: everything past the gate goes dark
    flow.edges.retain(|e| e.id != "e2");

    let result = traverse_flow(&flow);
    assert!(!result.has_valid_flow);
    assert_eq!(result.get("narrator").unwrap().position, 0);
    assert_eq!(result.get("judge").unwrap().position, -1);
    assert_eq!(result.get("poet").unwrap().position, -1);
}

// ============================================================================
// REPAIR ROUND-TRIP
// ============================================================================

#[test]
fn repair_then_validate_adds_no_new_errors() {
    let bare: weave::Node = serde_json::from_str(r#"{"id": "d1", "type": "dataStore"}"#).unwrap();
    assert!(!validate_node(&bare).is_valid());

    let repaired = repair_node(bare);
    let result = validate_node(&repaired);
    assert!(result.is_valid(), "repair left errors: {:?}", result.errors);

    // Idempotent: a second repair is a no-op
    assert_eq!(repaired, repair_node(repaired.clone()));
}

// ============================================================================
// TEMPLATES + RENAME ACROSS A FLOW
// ============================================================================

#[test]
fn prompt_references_project_onto_known_agents() {
    let flow = make_session_flow();
    let known = flow.agents.keys().cloned().collect();

    let judge_prompt = flow.agents["judge"].prompt_template.as_deref().unwrap();
    let referenced = extract_agent_variables(judge_prompt, Some(&known));
    assert_eq!(
        referenced.into_iter().collect::<Vec<_>>(),
        vec!["chronicler", "poet"]
    );

    // card.title is a system reference, not an agent
    let narrator_prompt = flow.agents["narrator"].prompt_template.as_deref().unwrap();
    assert!(extract_agent_variables(narrator_prompt, Some(&known)).is_empty());
}

#[test]
fn renaming_an_agent_keeps_the_flow_consistent() {
    let mut flow = make_session_flow();
    flow.rename_agent("narrator", "storyteller");

    // Node payload, agents map, and every referencing prompt follow
    assert!(flow.agents.contains_key("storyteller"));
    assert_eq!(
        flow.agents["poet"].prompt_template.as_deref(),
        Some("Answer {{storyteller}} in verse.")
    );
    assert_eq!(
        flow.agents["chronicler"].prompt_template.as_deref(),
        Some("Record {{storyteller.reply}}.")
    );

    // Traversal picks up the new identifier transparently
    let result = traverse_flow(&flow);
    assert_eq!(result.get("storyteller").unwrap().position, 0);
    assert!(result.get("narrator").is_none());
}
