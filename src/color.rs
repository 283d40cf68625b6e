//! Node color assignment
//!
//! A fixed palette shared by if and data-store nodes, plus a pure selection
//! function over a read-only snapshot of colors already in use. Lookup
//! failures degrade to a default color, never to an aborted traversal.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::flow::{Node, NodePayload};

/// 6-digit hex, case-insensitive
static HEX_COLOR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^#[0-9A-Fa-f]{6}$").unwrap());

/// Palette cycled through by newly created nodes
pub const NODE_PALETTE: &[&str] = &[
    "#8A2BE2", // violet
    "#FFBF00", // amber
    "#00FFFF", // cyan
    "#3FB950", // green
    "#D29922", // orange
    "#F85149", // red
    "#58A6FF", // blue
    "#DB61A2", // pink
];

pub const DEFAULT_NODE_COLOR: &str = NODE_PALETTE[0];

pub fn is_hex_color(value: &str) -> bool {
    HEX_COLOR_RE.is_match(value)
}

/// Pick a color for a new node given the set already in use. First free
/// palette entry wins; an exhausted palette wraps around deterministically.
pub fn pick_color(used: &HashSet<String>) -> &'static str {
    for color in NODE_PALETTE {
        if !used.iter().any(|u| u.eq_ignore_ascii_case(color)) {
            return color;
        }
    }
    NODE_PALETTE[used.len() % NODE_PALETTE.len()]
}

/// Effective display color of a node: its persisted color when it is a
/// well-formed hex value, the default otherwise.
pub fn node_color(node: &Node) -> &str {
    let persisted = match &node.payload {
        NodePayload::If(data) => data.color.as_deref(),
        NodePayload::DataStore(data) => data.color.as_deref(),
        _ => None,
    };
    match persisted {
        Some(color) if is_hex_color(color) => color,
        _ => DEFAULT_NODE_COLOR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::Node;

    #[test]
    fn hex_color_validation() {
        assert!(is_hex_color("#8A2BE2"));
        assert!(is_hex_color("#a1b2c3"));
        assert!(!is_hex_color("8A2BE2"));
        assert!(!is_hex_color("#8A2BE"));
        assert!(!is_hex_color("#8A2BE2FF"));
        assert!(!is_hex_color("#GGGGGG"));
    }

    #[test]
    fn pick_skips_used_colors() {
        let mut used = HashSet::new();
        assert_eq!(pick_color(&used), NODE_PALETTE[0]);

        used.insert(NODE_PALETTE[0].to_string());
        assert_eq!(pick_color(&used), NODE_PALETTE[1]);

        // case differences still count as used
        used.insert(NODE_PALETTE[1].to_lowercase());
        assert_eq!(pick_color(&used), NODE_PALETTE[2]);
    }

    #[test]
    fn exhausted_palette_wraps() {
        let used: HashSet<String> = NODE_PALETTE.iter().map(|c| c.to_string()).collect();
        let picked = pick_color(&used);
        assert!(NODE_PALETTE.contains(&picked));
    }

    #[test]
    fn node_color_prefers_persisted() {
        let node: Node = serde_json::from_str(
            r#"{"id": "d", "type": "dataStore", "position": {"x": 0, "y": 0},
                "data": {"color": "#3FB950", "dataStoreFields": []}}"#,
        )
        .unwrap();
        assert_eq!(node_color(&node), "#3FB950");
    }

    #[test]
    fn node_color_degrades_to_default() {
        let malformed: Node = serde_json::from_str(
            r#"{"id": "d", "type": "dataStore", "position": {"x": 0, "y": 0},
                "data": {"color": "tomato", "dataStoreFields": []}}"#,
        )
        .unwrap();
        assert_eq!(node_color(&malformed), DEFAULT_NODE_COLOR);

        let agent: Node = serde_json::from_str(
            r#"{"id": "a", "type": "agent", "position": {"x": 0, "y": 0}}"#,
        )
        .unwrap();
        assert_eq!(node_color(&agent), DEFAULT_NODE_COLOR);
    }
}
