//! Flow adjacency graph built from nodes and edges (Arc<str> optimized)
//!
//! Uses Arc<str> for zero-cost cloning of node IDs.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use crate::flow::{Edge, Node};

/// Forward and reverse adjacency for one flow
///
/// Both maps are pre-seeded with every node id mapped to an empty list, so
/// isolated nodes are present with no neighbors, never absent.
pub struct FlowGraph {
    /// node_id -> list of successor node_ids
    forward: HashMap<Arc<str>, Vec<Arc<str>>>,
    /// node_id -> list of predecessor node_ids
    reverse: HashMap<Arc<str>, Vec<Arc<str>>>,
    /// All node IDs in document order (for iteration)
    node_ids: Vec<Arc<str>>,
    /// Quick lookup for node existence (used in build for Arc reuse)
    node_set: HashSet<Arc<str>>,
}

impl FlowGraph {
    pub fn build(nodes: &[Node], edges: &[Edge]) -> Self {
        let capacity = nodes.len();
        let mut forward: HashMap<Arc<str>, Vec<Arc<str>>> = HashMap::with_capacity(capacity);
        let mut reverse: HashMap<Arc<str>, Vec<Arc<str>>> = HashMap::with_capacity(capacity);
        let mut node_ids: Vec<Arc<str>> = Vec::with_capacity(capacity);
        let mut node_set: HashSet<Arc<str>> = HashSet::with_capacity(capacity);

        // Create Arc<str> once per node, reuse everywhere
        for node in nodes {
            let id: Arc<str> = Arc::from(node.id.as_str());
            node_ids.push(Arc::clone(&id));
            node_set.insert(Arc::clone(&id));
            forward.insert(Arc::clone(&id), Vec::new());
            reverse.insert(id, Vec::new());
        }

        // Dangling endpoints get entries too; traversal from real nodes
        // treats them as dead ends, validation flags them separately.
        for edge in edges {
            let src_arc = node_set
                .get(edge.source.as_str())
                .cloned()
                .unwrap_or_else(|| Arc::from(edge.source.as_str()));
            let tgt_arc = node_set
                .get(edge.target.as_str())
                .cloned()
                .unwrap_or_else(|| Arc::from(edge.target.as_str()));

            forward
                .entry(Arc::clone(&src_arc))
                .or_default()
                .push(Arc::clone(&tgt_arc));
            reverse.entry(tgt_arc).or_default().push(src_arc);
        }

        Self {
            forward,
            reverse,
            node_ids,
            node_set,
        }
    }

    /// Get successors of a node (returns Arc<str> slice)
    #[inline]
    pub fn successors(&self, node_id: &str) -> &[Arc<str>] {
        static EMPTY: &[Arc<str>] = &[];
        self.forward
            .get(node_id)
            .map(|v| v.as_slice())
            .unwrap_or(EMPTY)
    }

    /// Get predecessors of a node
    #[inline]
    pub fn predecessors(&self, node_id: &str) -> &[Arc<str>] {
        static EMPTY: &[Arc<str>] = &[];
        self.reverse
            .get(node_id)
            .map(|v| v.as_slice())
            .unwrap_or(EMPTY)
    }

    /// All node IDs in document order
    pub fn node_ids(&self) -> &[Arc<str>] {
        &self.node_ids
    }

    /// Check if node exists
    #[inline]
    pub fn contains(&self, node_id: &str) -> bool {
        self.node_set.contains(node_id)
    }

    /// Check if there's a path from `from` to `to` (BFS)
    pub fn has_path(&self, from: &str, to: &str) -> bool {
        if from == to {
            return true;
        }

        let mut visited: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<&str> = VecDeque::new();

        queue.push_back(from);
        visited.insert(from);

        while let Some(current) = queue.pop_front() {
            for neighbor in self.successors(current) {
                if neighbor.as_ref() == to {
                    return true;
                }
                if visited.insert(neighbor.as_ref()) {
                    queue.push_back(neighbor.as_ref());
                }
            }
        }

        false
    }
}
