//! Flow traversal: reachability, depth, and execution order
//!
//! Walks the adjacency graph from the start node (forward) and the end node
//! (backward), computes shortest-path depths, and assigns every reachable
//! agent a sequential position. Degrades to data, never errors: a flow with
//! no start node, disconnected agents, or cycles produces a result object
//! with `-1` positions and `has_valid_flow: false` rather than failing.

use std::collections::{HashMap, HashSet, VecDeque};

use serde::Serialize;

use crate::flow::Flow;
use crate::graph::FlowGraph;

/// Where one agent sits in the execution order of a flow
///
/// Recomputed on every traversal from the current flow snapshot; callers
/// treat it as immutable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentPosition {
    pub agent_id: String,
    /// 0-based execution slot, -1 when disconnected from start
    pub position: i32,
    pub is_connected_to_start: bool,
    pub is_connected_to_end: bool,
    /// Shortest-path edge count from the start node, -1 when unreachable
    pub depth: i32,
}

/// Result of one traversal pass over a flow
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowTraversalResult {
    /// Positioned agents in execution order, then disconnected agents by id
    pub agents: Vec<AgentPosition>,
    /// True when at least one agent sits on a complete start→end path
    /// (or, with no end node, is reachable from start at all)
    pub has_valid_flow: bool,
}

impl FlowTraversalResult {
    pub fn get(&self, agent_id: &str) -> Option<&AgentPosition> {
        self.agents.iter().find(|a| a.agent_id == agent_id)
    }

    /// Agent ids in execution order (positioned agents only)
    pub fn execution_order(&self) -> impl Iterator<Item = &str> {
        self.agents
            .iter()
            .filter(|a| a.position >= 0)
            .map(|a| a.agent_id.as_str())
    }
}

/// Compute reachability, depth, and positions for every agent in the flow.
///
/// Two agent nodes resolving to the same effective agent id collapse to one
/// entry; the first node in document order wins.
pub fn traverse_flow(flow: &Flow) -> FlowTraversalResult {
    // agent_id -> owning node id, first node in document order wins
    let mut agent_ids: Vec<&str> = Vec::new();
    let mut node_of: HashMap<&str, &str> = HashMap::new();
    for node in flow.agent_nodes() {
        let agent_id = node.agent_id().unwrap_or(&node.id);
        node_of.entry(agent_id).or_insert_with(|| {
            agent_ids.push(agent_id);
            node.id.as_str()
        });
    }

    let Some(start) = flow.start_node() else {
        // No start node is a valid editing state: everything disconnected.
        let mut agents: Vec<AgentPosition> =
            agent_ids.iter().map(|&id| disconnected(id)).collect();
        agents.sort_by(|a, b| a.agent_id.cmp(&b.agent_id));
        return FlowTraversalResult {
            agents,
            has_valid_flow: false,
        };
    };

    let graph = FlowGraph::build(&flow.nodes, &flow.edges);

    let from_start = reachable_from(&graph, &start.id, Direction::Forward);
    let to_end = flow
        .end_node()
        .map(|end| reachable_from(&graph, &end.id, Direction::Backward));
    let depth_of = depths_from(&graph, &start.id);

    // Start-reachable agents ordered by (depth, agent id): equal depths fall
    // back to identifier order so repeated runs are byte-identical.
    let mut reachable: Vec<(&str, i32)> = Vec::new();
    let mut rest: Vec<&str> = Vec::new();
    for &agent_id in &agent_ids {
        let node_id = node_of[agent_id];
        match depth_of.get(node_id) {
            Some(&depth) if from_start.contains(node_id) => reachable.push((agent_id, depth)),
            _ => rest.push(agent_id),
        }
    }
    reachable.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)));
    rest.sort();

    let mut has_valid_flow = false;
    let mut agents: Vec<AgentPosition> = Vec::with_capacity(agent_ids.len());

    for (index, &(agent_id, depth)) in reachable.iter().enumerate() {
        let node_id = node_of[agent_id];
        let is_connected_to_end = match &to_end {
            Some(set) => set.contains(node_id),
            // No end node: reaching start is the whole requirement
            None => true,
        };
        if is_connected_to_end {
            has_valid_flow = true;
        }
        agents.push(AgentPosition {
            agent_id: agent_id.to_string(),
            position: index as i32,
            is_connected_to_start: true,
            is_connected_to_end,
            depth,
        });
    }

    for agent_id in rest {
        agents.push(disconnected(agent_id));
    }

    FlowTraversalResult {
        agents,
        has_valid_flow,
    }
}

fn disconnected(agent_id: &str) -> AgentPosition {
    AgentPosition {
        agent_id: agent_id.to_string(),
        position: -1,
        is_connected_to_start: false,
        is_connected_to_end: false,
        depth: -1,
    }
}

#[derive(Clone, Copy)]
enum Direction {
    Forward,
    Backward,
}

/// Iterative DFS; the visited set keeps cycles from looping forever.
fn reachable_from<'a>(
    graph: &'a FlowGraph,
    origin: &'a str,
    direction: Direction,
) -> HashSet<&'a str> {
    let mut visited: HashSet<&str> = HashSet::new();
    let mut stack: Vec<&str> = vec![origin];

    while let Some(current) = stack.pop() {
        if !visited.insert(current) {
            continue;
        }
        let neighbors = match direction {
            Direction::Forward => graph.successors(current),
            Direction::Backward => graph.predecessors(current),
        };
        for neighbor in neighbors {
            if !visited.contains(neighbor.as_ref()) {
                stack.push(neighbor.as_ref());
            }
        }
    }

    visited
}

/// BFS shortest-path depth (edge count) from the origin to every node it
/// can reach.
fn depths_from<'a>(graph: &'a FlowGraph, origin: &'a str) -> HashMap<&'a str, i32> {
    let mut depth: HashMap<&str, i32> = HashMap::new();
    let mut queue: VecDeque<&str> = VecDeque::new();

    depth.insert(origin, 0);
    queue.push_back(origin);

    while let Some(current) = queue.pop_front() {
        let d = depth[current];
        for neighbor in graph.successors(current) {
            if !depth.contains_key(neighbor.as_ref()) {
                depth.insert(neighbor.as_ref(), d + 1);
                queue.push_back(neighbor.as_ref());
            }
        }
    }

    depth
}
