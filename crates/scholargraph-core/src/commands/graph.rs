//! Graph inspection helpers for the shell
//!
//! Plain-text renderings of nodes, statistics and node neighbourhoods.

use std::fmt::Write as _;

use serde::Serialize;

use crate::domain::graph::{GraphStats, LinkDirection, Node};
use crate::domain::layout::NodePosition;
use crate::domain::selection::RelatedLink;
use crate::error::{Error, Result};
use crate::workspace::GraphState;

/// A node with the visible links around it
#[derive(Debug, Clone, Serialize)]
pub struct NodeDetail {
    pub node: Node,
    pub related: Vec<RelatedLink>,
}

/// Look up a canonical or suggested node and its visible neighbourhood
pub fn node_detail(state: &GraphState, id: &str) -> Result<NodeDetail> {
    let node = state
        .store()
        .node(id)
        .or_else(|| state.overlay().node(id))
        .ok_or_else(|| Error::NotFound(id.to_string()))?;
    Ok(NodeDetail {
        node: node.clone(),
        related: state.related_links(id),
    })
}

/// One-line summary: marker, id, kind, year, label, group and badges
pub fn describe_node(node: &Node) -> String {
    let marker = if node.is_suggestion {
        "?"
    } else if node.starred {
        "*"
    } else {
        " "
    };
    let mut line = format!("{} {} [{}]", marker, node.id, node.kind);
    if let Some(year) = node.year {
        let _ = write!(line, " {}", year);
    }
    let _ = write!(line, " {}", node.label);
    if !node.group.is_empty() {
        let _ = write!(line, " ({})", node.group);
    }
    if !node.badges.is_empty() {
        let badges: Vec<String> = node.badges.iter().map(|b| b.label()).collect();
        let _ = write!(line, " {{{}}}", badges.join(", "));
    }
    line
}

pub fn render_stats(stats: &GraphStats) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Nodes: {}", stats.total_nodes);
    let _ = writeln!(out, "Links: {}", stats.total_links);
    let _ = writeln!(out, "Starred: {}", stats.starred);
    if stats.dangling_links > 0 {
        let _ = writeln!(out, "Dangling links: {}", stats.dangling_links);
    }
    if !stats.nodes_by_kind.is_empty() {
        let _ = writeln!(out, "\nBy kind:");
        for (kind, count) in &stats.nodes_by_kind {
            let _ = writeln!(out, "  {:<16} {}", kind, count);
        }
    }
    if !stats.nodes_by_group.is_empty() {
        let _ = writeln!(out, "\nBy group:");
        for (group, count) in &stats.nodes_by_group {
            let _ = writeln!(out, "  {:<24} {}", group, count);
        }
    }
    out
}

pub fn render_detail(detail: &NodeDetail) -> String {
    let mut out = describe_node(&detail.node);
    out.push('\n');
    if let Some(reason) = &detail.node.reason {
        let _ = writeln!(out, "Suggested because: {}", reason);
    }
    if !detail.node.content.trim().is_empty() {
        let _ = writeln!(out, "\n{}", detail.node.content.trim());
    }
    if !detail.related.is_empty() {
        let _ = writeln!(out, "\nLinks:");
        for related in &detail.related {
            let arrow = match related.direction {
                LinkDirection::Outgoing => "->",
                LinkDirection::Incoming => "<-",
            };
            let _ = writeln!(
                out,
                "  {} {} {} ({})",
                arrow, related.link.label, related.other.label, related.other.id
            );
        }
    }
    out
}

pub fn render_positions(positions: &[NodePosition]) -> String {
    positions
        .iter()
        .map(|p| format!("{:<24} x={:>8.1} y={:>8.1} r={:.0}", p.id, p.x, p.y, p.radius))
        .collect::<Vec<_>>()
        .join("\n")
}
