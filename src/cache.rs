//! Traversal memoization with DashMap
//!
//! Traversal runs on every render and interaction, so results are cached
//! per structural signature of the flow. Keys never involve wall-clock
//! time: a cache entry is valid until the node or edge set changes.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use dashmap::DashMap;

use crate::flow::Flow;
use crate::traversal::{traverse_flow, FlowTraversalResult};

/// Thread-safe cache of traversal results
#[derive(Default)]
pub struct TraversalCache {
    /// structural key → shared result snapshot
    entries: DashMap<u64, Arc<FlowTraversalResult>>,
}

impl TraversalCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Structural signature of a flow: node ids, types, and effective agent
    /// ids plus edge endpoints. Canvas positions and payload cosmetics do
    /// not participate, so unrelated edits keep the cache warm.
    pub fn structural_key(flow: &Flow) -> u64 {
        let mut hasher = DefaultHasher::new();
        for node in &flow.nodes {
            node.id.hash(&mut hasher);
            node.node_type().hash(&mut hasher);
            node.agent_id().hash(&mut hasher);
        }
        // Section marker so a node id can never collide with an edge endpoint
        u64::MAX.hash(&mut hasher);
        for edge in &flow.edges {
            edge.source.hash(&mut hasher);
            edge.target.hash(&mut hasher);
        }
        hasher.finish()
    }

    /// Traverse through the cache. Concurrent callers with the same key see
    /// one computation: the entry lock holds the others until the first
    /// caller has stored its result.
    pub fn traverse(&self, flow: &Flow) -> Arc<FlowTraversalResult> {
        let key = Self::structural_key(flow);
        self.entries
            .entry(key)
            .or_insert_with(|| {
                tracing::debug!(key, "traversal cache miss");
                Arc::new(traverse_flow(flow))
            })
            .clone()
    }

    /// Drop the entry for this flow's current structure
    pub fn invalidate(&self, flow: &Flow) {
        self.entries.remove(&Self::structural_key(flow));
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
