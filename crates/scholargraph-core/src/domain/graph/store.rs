//! Canonical graph storage
//!
//! The store is the single owner of confirmed nodes and links. It keeps
//! insertion order (the layout and the shell both rely on stable ordering)
//! and an id index for constant-time lookups.

use std::collections::{BTreeMap, HashMap};

use chrono::Local;
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{Error, Result};

use super::event::GraphEvent;
use super::grouping::GroupingRules;
use super::link::Link;
use super::node::{Node, NodeDraft, NodeKind, PROMOTED_GROUP};

/// Outcome of inserting a link into storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkInsertion {
    /// Both endpoints resolved
    Resolved,
    /// Stored, but these endpoint ids do not resolve yet
    Dangling(Vec<String>),
}

impl LinkInsertion {
    pub fn is_dangling(&self) -> bool {
        matches!(self, Self::Dangling(_))
    }
}

/// Counts describing the canonical graph
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GraphStats {
    pub total_nodes: usize,
    pub total_links: usize,
    pub starred: usize,
    pub dangling_links: usize,
    pub nodes_by_kind: BTreeMap<String, usize>,
    pub nodes_by_group: BTreeMap<String, usize>,
}

/// The canonical node/link store
#[derive(Debug, Clone, Default)]
pub struct GraphStore {
    nodes: Vec<Node>,
    index: HashMap<String, usize>,
    links: Vec<Link>,
    rules: GroupingRules,
    events: Vec<GraphEvent>,
}

impl GraphStore {
    /// Create an empty store with the default grouping rules
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store with custom grouping rules
    pub fn with_rules(rules: GroupingRules) -> Self {
        Self {
            rules,
            ..Default::default()
        }
    }

    pub fn rules(&self) -> &GroupingRules {
        &self.rules
    }

    /// Replace the grouping rules; existing groups are untouched until `regroup_all`
    pub fn set_rules(&mut self, rules: GroupingRules) {
        self.rules = rules;
    }

    // ========== Node Operations ==========

    /// Insert a fully-formed canonical node
    pub fn insert_node(&mut self, node: Node) -> Result<()> {
        if node.is_suggestion {
            return Err(Error::InvalidInput(format!(
                "node '{}' is a suggestion and cannot be stored canonically",
                node.id
            )));
        }
        if self.index.contains_key(&node.id) {
            return Err(Error::DuplicateId(node.id));
        }

        debug!(node_id = %node.id, group = %node.group, "Inserting node");
        self.events
            .push(GraphEvent::node_inserted(&node.id, node.kind, &node.group));
        self.index.insert(node.id.clone(), self.nodes.len());
        self.nodes.push(node);
        Ok(())
    }

    /// Build a node from a draft, assign its group, and insert it
    pub fn add_node(&mut self, draft: NodeDraft) -> Result<String> {
        let kind = draft
            .kind
            .ok_or_else(|| Error::InvalidInput("node kind is required".into()))?;
        if draft.label.trim().is_empty() {
            return Err(Error::InvalidInput("node label must not be empty".into()));
        }

        let group = self.rules.assign(kind, &draft.badges, &draft.label);
        let node = Node {
            id: draft.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            label: draft.label,
            kind,
            content: draft.content,
            added_date: Local::now().date_naive(),
            year: draft.year,
            badges: draft.badges,
            group,
            starred: false,
            is_suggestion: false,
            reason: None,
        };
        let id = node.id.clone();
        self.insert_node(node)?;
        Ok(id)
    }

    /// Partially update a node's label and/or content
    pub fn update_node_content(
        &mut self,
        id: &str,
        new_label: Option<&str>,
        new_content: Option<&str>,
    ) -> Result<()> {
        let node = self.node_mut(id)?;
        let mut changes = Vec::new();

        if let Some(label) = new_label
            && label != node.label
        {
            node.label = label.to_string();
            changes.push("label".to_string());
        }
        if let Some(content) = new_content
            && content != node.content
        {
            node.content = content.to_string();
            changes.push("content".to_string());
        }

        if !changes.is_empty() {
            self.events.push(GraphEvent::node_updated(id, changes));
        }
        Ok(())
    }

    /// Flip a node's star; returns the new value
    pub fn toggle_star(&mut self, id: &str) -> Result<bool> {
        let node = self.node_mut(id)?;
        node.starred = !node.starred;
        let starred = node.starred;
        self.events.push(GraphEvent::NodeStarred {
            node_id: id.to_string(),
            starred,
            timestamp: chrono::Utc::now(),
        });
        Ok(starred)
    }

    /// Delete a node and every canonical link touching it
    pub fn remove_node(&mut self, id: &str) -> Result<Node> {
        let position = *self
            .index
            .get(id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;

        let node = self.nodes.remove(position);
        self.reindex();

        let before = self.links.len();
        self.links.retain(|l| !l.touches(id));
        let links_removed = before - self.links.len();

        info!(node_id = %id, links_removed, "Removed node");
        self.events.push(GraphEvent::NodeRemoved {
            node_id: id.to_string(),
            links_removed,
            timestamp: chrono::Utc::now(),
        });
        Ok(node)
    }

    /// Recompute computed groups from the current rules
    ///
    /// Notes and promoted suggestions keep their fixed groups. Returns the
    /// number of nodes whose group changed.
    pub fn regroup_all(&mut self) -> usize {
        let mut changed = 0;
        for node in &mut self.nodes {
            if node.kind == NodeKind::Note || node.group == PROMOTED_GROUP {
                continue;
            }
            let group = self.rules.assign(node.kind, &node.badges, &node.label);
            if group != node.group {
                node.group = group;
                changed += 1;
            }
        }
        debug!(changed, "Regrouped nodes");
        changed
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    fn node_mut(&mut self, id: &str) -> Result<&mut Node> {
        match self.index.get(id) {
            Some(&i) => Ok(&mut self.nodes[i]),
            None => Err(Error::NotFound(id.to_string())),
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Nodes in insertion order
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    // ========== Link Operations ==========

    /// Check that both endpoints of a link resolve in this store
    pub fn validate_link(&self, link: &Link) -> Result<()> {
        let missing = self.missing_endpoints(link);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::DanglingEndpoint {
                source_id: link.source.clone(),
                target_id: link.target.clone(),
                missing,
            })
        }
    }

    /// Insert a canonical link
    ///
    /// Dangling endpoints are tolerated and reported back to the caller.
    pub fn insert_link(&mut self, link: Link) -> Result<LinkInsertion> {
        if link.is_suggestion {
            return Err(Error::InvalidInput(format!(
                "link {} -> {} is a suggestion and cannot be stored canonically",
                link.source, link.target
            )));
        }

        let missing = self.missing_endpoints(&link);
        let outcome = if missing.is_empty() {
            LinkInsertion::Resolved
        } else {
            warn!(
                source = %link.source,
                target = %link.target,
                missing = ?missing,
                "Link stored with dangling endpoint"
            );
            LinkInsertion::Dangling(missing)
        };

        self.events.push(GraphEvent::link_inserted(
            &link.source,
            &link.target,
            &link.label,
            outcome.is_dangling(),
        ));
        self.links.push(link);
        Ok(outcome)
    }

    fn missing_endpoints(&self, link: &Link) -> Vec<String> {
        let mut missing = Vec::new();
        if !self.contains(&link.source) {
            missing.push(link.source.clone());
        }
        if link.target != link.source && !self.contains(&link.target) {
            missing.push(link.target.clone());
        }
        missing
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// Whether a canonical link already connects `source` to `target`
    pub fn contains_link_pair(&self, source: &str, target: &str) -> bool {
        self.links.iter().any(|l| l.same_pair(source, target))
    }

    /// Canonical links touching a node
    pub fn links_for(&self, id: &str) -> Vec<&Link> {
        self.links.iter().filter(|l| l.touches(id)).collect()
    }

    /// Canonical links connecting `a` and `b` in either direction
    pub fn links_between(&self, a: &str, b: &str) -> Vec<&Link> {
        self.links
            .iter()
            .filter(|l| l.same_pair(a, b) || l.same_pair(b, a))
            .collect()
    }

    // ========== Events & Stats ==========

    /// Audit trail of mutations
    pub fn events(&self) -> &[GraphEvent] {
        &self.events
    }

    pub(crate) fn record(&mut self, event: GraphEvent) {
        self.events.push(event);
    }

    /// Summary counts
    pub fn stats(&self) -> GraphStats {
        let mut stats = GraphStats {
            total_nodes: self.nodes.len(),
            total_links: self.links.len(),
            ..Default::default()
        };

        for node in &self.nodes {
            *stats
                .nodes_by_kind
                .entry(node.kind.as_str().to_string())
                .or_insert(0) += 1;
            *stats.nodes_by_group.entry(node.group.clone()).or_insert(0) += 1;
            if node.starred {
                stats.starred += 1;
            }
        }
        stats.dangling_links = self
            .links
            .iter()
            .filter(|l| !self.missing_endpoints(l).is_empty())
            .count();

        stats
    }

    fn reindex(&mut self) {
        self.index = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id.clone(), i))
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::graph::node::Badge;

    fn store_with(ids: &[&str]) -> GraphStore {
        let mut store = GraphStore::new();
        for id in ids {
            store
                .insert_node(Node::new(format!("Node {id}"), NodeKind::Paper).with_id(*id))
                .unwrap();
        }
        store
    }

    #[test]
    fn test_insert_node_rejects_duplicates() {
        let mut store = store_with(&["a"]);
        let err = store
            .insert_node(Node::new("again", NodeKind::Note).with_id("a"))
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateId(id) if id == "a"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_insert_node_rejects_suggestions() {
        let mut store = GraphStore::new();
        let node = Node::new("ghost", NodeKind::Concept).into_suggestion(None);
        assert!(matches!(store.insert_node(node), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_add_node_assigns_group() {
        let mut store = GraphStore::new();
        let paper = store
            .add_node(
                NodeDraft::new("Deep nets", NodeKind::Paper)
                    .with_badges(vec![Badge::partitioned("CAS", "Q1")])
                    .with_year(2021),
            )
            .unwrap();
        let note = store
            .add_node(NodeDraft::new("Reading list", NodeKind::Note))
            .unwrap();
        let concept = store
            .add_node(NodeDraft::new("Quantum annealing", NodeKind::Concept))
            .unwrap();

        assert_eq!(store.node(&paper).unwrap().group, "CAS Q1");
        assert_eq!(store.node(&note).unwrap().group, "Personal Notes");
        assert_eq!(store.node(&concept).unwrap().group, "Quantum AI");
    }

    #[test]
    fn test_add_node_requires_label() {
        let mut store = GraphStore::new();
        assert!(store.add_node(NodeDraft::new("  ", NodeKind::Paper)).is_err());
    }

    #[test]
    fn test_update_node_content_partial() {
        let mut store = store_with(&["a"]);
        store
            .update_node_content("a", None, Some("new body"))
            .unwrap();

        let node = store.node("a").unwrap();
        assert_eq!(node.label, "Node a");
        assert_eq!(node.content, "new body");

        store.update_node_content("a", Some("Renamed"), None).unwrap();
        assert_eq!(store.node("a").unwrap().label, "Renamed");
        assert_eq!(store.node("a").unwrap().content, "new body");
    }

    #[test]
    fn test_update_missing_node() {
        let mut store = GraphStore::new();
        assert!(matches!(
            store.update_node_content("zzz", Some("x"), None),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_toggle_star() {
        let mut store = store_with(&["a"]);
        assert!(store.toggle_star("a").unwrap());
        assert!(!store.toggle_star("a").unwrap());
        assert!(matches!(store.toggle_star("b"), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_insert_link_tolerates_dangling() {
        let mut store = store_with(&["a", "b"]);
        assert_eq!(
            store.insert_link(Link::new("a", "b", "Cites")).unwrap(),
            LinkInsertion::Resolved
        );
        let outcome = store.insert_link(Link::new("a", "ghost", "Cites")).unwrap();
        assert_eq!(outcome, LinkInsertion::Dangling(vec!["ghost".into()]));
        assert_eq!(store.link_count(), 2);
        assert_eq!(store.stats().dangling_links, 1);
    }

    #[test]
    fn test_validate_link() {
        let store = store_with(&["a"]);
        assert!(store.validate_link(&Link::new("a", "a", "Self")).is_ok());
        let err = store.validate_link(&Link::new("x", "y", "Cites")).unwrap_err();
        assert!(err.is_advisory());
    }

    #[test]
    fn test_remove_node_drops_links() {
        let mut store = store_with(&["a", "b", "c"]);
        store.insert_link(Link::new("a", "b", "Cites")).unwrap();
        store.insert_link(Link::new("b", "c", "Cites")).unwrap();
        store.insert_link(Link::new("a", "c", "Cites")).unwrap();

        store.remove_node("b").unwrap();

        assert!(!store.contains("b"));
        assert_eq!(store.link_count(), 1);
        assert_eq!(store.node("c").unwrap().id, "c");
        assert!(matches!(store.remove_node("b"), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_regroup_all() {
        let mut store = GraphStore::with_rules(GroupingRules::empty());
        let id = store
            .add_node(NodeDraft::new("Quantum walks", NodeKind::Paper))
            .unwrap();
        assert_eq!(store.node(&id).unwrap().group, "Uncategorized");

        store.set_rules(GroupingRules::research_ai());
        assert_eq!(store.regroup_all(), 1);
        assert_eq!(store.node(&id).unwrap().group, "Quantum AI");
    }

    #[test]
    fn test_regroup_all_keeps_promoted_group() {
        let mut store = GraphStore::with_rules(GroupingRules::empty());
        store
            .insert_node(
                Node::new("Quantum sampling", NodeKind::Concept)
                    .with_id("p")
                    .with_group(PROMOTED_GROUP),
            )
            .unwrap();

        store.set_rules(GroupingRules::research_ai());
        assert_eq!(store.regroup_all(), 0);
        assert_eq!(store.node("p").unwrap().group, PROMOTED_GROUP);
    }

    #[test]
    fn test_stats_and_events() {
        let mut store = store_with(&["a", "b"]);
        store.toggle_star("a").unwrap();
        store.insert_link(Link::new("a", "b", "Cites")).unwrap();

        let stats = store.stats();
        assert_eq!(stats.total_nodes, 2);
        assert_eq!(stats.total_links, 1);
        assert_eq!(stats.starred, 1);
        assert_eq!(stats.nodes_by_kind.get("paper"), Some(&2));

        let names: Vec<_> = store.events().iter().map(|e| e.event_type_name()).collect();
        assert_eq!(
            names,
            vec!["node_inserted", "node_inserted", "node_starred", "link_inserted"]
        );
    }

    #[test]
    fn test_links_between_either_direction() {
        let mut store = store_with(&["a", "b", "c"]);
        store.insert_link(Link::new("a", "b", "Cites")).unwrap();
        store.insert_link(Link::new("b", "a", "Extends")).unwrap();
        store.insert_link(Link::new("a", "c", "Cites")).unwrap();

        assert_eq!(store.links_between("a", "b").len(), 2);
        assert_eq!(store.links_between("c", "a").len(), 1);
        assert!(store.links_between("b", "c").is_empty());
        assert!(store.contains_link_pair("b", "a"));
        assert!(!store.contains_link_pair("c", "a"));
    }
}
