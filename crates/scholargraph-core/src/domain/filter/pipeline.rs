//! Visible-set computation
//!
//! Resolution order:
//!
//! 1. Semantic results, when present, pick nodes from canonical ∪ overlay by
//!    id and bypass every other filter.
//! 2. Otherwise canonical nodes must pass all active standard filters.
//! 3. With suggestion mode on (and no semantic results) every overlay node is
//!    appended, regardless of the standard filters.
//! 4. Links are kept only when both endpoints are visible; overlay links only
//!    in suggestion mode.

use std::collections::HashSet;

use crate::domain::graph::{GraphStore, Link, Node};
use crate::domain::suggestion::SuggestionEngine;

use super::query::FilterState;
use super::semantic::SemanticSearch;

/// Nodes and links currently shown
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VisibleGraph {
    pub nodes: Vec<Node>,
    pub links: Vec<Link>,
}

impl VisibleGraph {
    pub fn contains(&self, id: &str) -> bool {
        self.nodes.iter().any(|n| n.id == id)
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn node_ids(&self) -> Vec<&str> {
        self.nodes.iter().map(|n| n.id.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Derive the visible graph from store, overlay and query state
pub fn compute_visible(
    store: &GraphStore,
    overlay: &SuggestionEngine,
    filters: &FilterState,
    semantic: &SemanticSearch,
) -> VisibleGraph {
    let nodes: Vec<Node> = match semantic.results() {
        Some(ids) => {
            let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
            store
                .nodes()
                .iter()
                .chain(overlay.nodes())
                .filter(|n| wanted.contains(n.id.as_str()))
                .cloned()
                .collect()
        }
        None => {
            let active = filters.active_filters();
            let mut nodes: Vec<Node> = store
                .nodes()
                .iter()
                .filter(|n| active.iter().all(|f| f.matches(n)))
                .cloned()
                .collect();
            if filters.show_suggestions {
                nodes.extend(overlay.nodes().iter().cloned());
            }
            nodes
        }
    };

    let visible_ids: HashSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
    let endpoints_visible = |l: &&Link| {
        visible_ids.contains(l.source.as_str()) && visible_ids.contains(l.target.as_str())
    };

    let mut links: Vec<Link> = store.links().iter().filter(endpoints_visible).cloned().collect();
    if filters.show_suggestions {
        links.extend(overlay.links().iter().filter(endpoints_visible).cloned());
    }

    VisibleGraph { nodes, links }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::filter::YearFilter;
    use crate::domain::filter::query::StandardFilter;
    use crate::domain::graph::{Badge, NodeKind};
    use crate::domain::suggestion::SuggestionBatch;

    fn sample_store() -> GraphStore {
        let mut store = GraphStore::new();
        let nodes = vec![
            Node::new("Quantum ensembles", NodeKind::Paper)
                .with_id("A")
                .with_year(2021)
                .with_badges(vec![Badge::partitioned("CAS", "Q1")]),
            Node::new("Medical imaging survey", NodeKind::Paper)
                .with_id("B")
                .with_year(2015)
                .with_badges(vec![Badge::partitioned("CAS", "Q2")]),
            Node::new("My reading notes", NodeKind::Note)
                .with_id("C")
                .with_content("quantum things to read"),
            Node::new("Attention", NodeKind::Concept).with_id("D").with_year(2021),
            Node::new("Graph kernels", NodeKind::Paper)
                .with_id("E")
                .with_year(2010)
                .starred(),
        ];
        for node in nodes {
            store.insert_node(node).unwrap();
        }
        store.insert_link(Link::new("A", "B", "Cites")).unwrap();
        store.insert_link(Link::new("A", "C", "Noted in")).unwrap();
        store.insert_link(Link::new("D", "ghost", "Dangling")).unwrap();
        store
    }

    fn overlay_for(store: &mut GraphStore) -> SuggestionEngine {
        let mut overlay = SuggestionEngine::new();
        overlay.replace_overlay(
            SuggestionBatch::new(
                vec![Node::new("Quantum ensembles v2", NodeKind::Concept).with_id("S")],
                vec![Link::new("A", "S", "Evolved To")],
            ),
            store,
        );
        overlay
    }

    fn ids(visible: &VisibleGraph) -> Vec<&str> {
        visible.node_ids()
    }

    #[test]
    fn test_no_filters_shows_canonical_only() {
        let mut store = sample_store();
        let overlay = overlay_for(&mut store);
        let visible =
            compute_visible(&store, &overlay, &FilterState::new(), &SemanticSearch::new());

        assert_eq!(ids(&visible), vec!["A", "B", "C", "D", "E"]);
        // Dangling link stays in storage but is never visible
        assert_eq!(visible.links.len(), 2);
        assert_eq!(store.link_count(), 3);
    }

    #[test]
    fn test_partition_filter_scenario() {
        let mut store = GraphStore::new();
        store
            .insert_node(
                Node::new("one", NodeKind::Paper)
                    .with_id("1")
                    .with_badges(vec![Badge::partitioned("CAS", "Q1")]),
            )
            .unwrap();
        store
            .insert_node(
                Node::new("two", NodeKind::Paper)
                    .with_id("2")
                    .with_badges(vec![Badge::partitioned("CAS", "Q3")]),
            )
            .unwrap();
        store.insert_node(Node::new("three", NodeKind::Paper).with_id("3")).unwrap();
        let mut overlay = SuggestionEngine::new();
        overlay.replace_overlay(
            SuggestionBatch::new(vec![Node::new("idea", NodeKind::Concept).with_id("s")], vec![]),
            &mut store,
        );

        let filters = FilterState::new().with_partition("Q1");
        let visible = compute_visible(&store, &overlay, &filters, &SemanticSearch::new());
        assert_eq!(visible.nodes.len(), 1);

        let with_overlay = filters.with_suggestions(true);
        let visible = compute_visible(&store, &overlay, &with_overlay, &SemanticSearch::new());
        assert_eq!(ids(&visible), vec!["1", "s"]);
    }

    #[test]
    fn test_semantic_results_bypass_filters() {
        let store = sample_store();
        let overlay = SuggestionEngine::new();
        let filters = FilterState::new()
            .with_query("nothing like this")
            .with_partition("Q4")
            .starred_only()
            .with_suggestions(true);
        let mut semantic = SemanticSearch::new();
        semantic.set_results("q", vec!["A".into()]);

        let visible = compute_visible(&store, &overlay, &filters, &semantic);
        assert_eq!(ids(&visible), vec!["A"]);
        assert!(visible.links.is_empty());
    }

    #[test]
    fn test_semantic_empty_result_shows_nothing() {
        let store = sample_store();
        let mut semantic = SemanticSearch::new();
        semantic.set_results("q", vec![]);
        let visible =
            compute_visible(&store, &SuggestionEngine::new(), &FilterState::new(), &semantic);
        assert!(visible.is_empty());
    }

    #[test]
    fn test_semantic_can_select_overlay_nodes() {
        let mut store = sample_store();
        let overlay = overlay_for(&mut store);
        let mut semantic = SemanticSearch::new();
        semantic.set_results("q", vec!["S".into(), "A".into(), "unknown".into()]);

        let visible = compute_visible(
            &store,
            &overlay,
            &FilterState::new().with_suggestions(true),
            &semantic,
        );
        assert_eq!(ids(&visible), vec!["A", "S"]);
        assert_eq!(visible.links.len(), 1);
        assert!(visible.links[0].is_suggestion);
    }

    #[test]
    fn test_suggestions_bypass_standard_filters() {
        let mut store = sample_store();
        let overlay = overlay_for(&mut store);
        let filters = FilterState::new().starred_only().with_suggestions(true);

        let visible = compute_visible(&store, &overlay, &filters, &SemanticSearch::new());
        assert_eq!(ids(&visible), vec!["E", "S"]);
        // A is hidden, so A -> S is not visible
        assert!(visible.links.is_empty());
    }

    #[test]
    fn test_overlay_links_hidden_without_suggestion_mode() {
        let mut store = sample_store();
        let overlay = overlay_for(&mut store);
        let visible =
            compute_visible(&store, &overlay, &FilterState::new(), &SemanticSearch::new());
        assert!(visible.links.iter().all(|l| !l.is_suggestion));
    }

    #[test]
    fn test_text_matches_label_or_content() {
        let store = sample_store();
        let filters = FilterState::new().with_query("QUANTUM");
        let visible =
            compute_visible(&store, &SuggestionEngine::new(), &filters, &SemanticSearch::new());
        assert_eq!(ids(&visible), vec!["A", "C"]);
    }

    #[test]
    fn test_year_filters() {
        let store = sample_store();
        let overlay = SuggestionEngine::new();
        let semantic = SemanticSearch::new();

        let exact = FilterState::new().with_year(YearFilter::Exact(2021));
        assert_eq!(ids(&compute_visible(&store, &overlay, &exact, &semantic)), vec!["A", "D"]);

        let older = FilterState::new().with_year(YearFilter::OlderThan(2016));
        assert_eq!(ids(&compute_visible(&store, &overlay, &older, &semantic)), vec!["B", "E"]);
    }

    #[test]
    fn test_filter_order_independence() {
        let store = sample_store();
        let filters = [
            StandardFilter::Text("a".into()),
            StandardFilter::Partition("Q1".into()),
            StandardFilter::Year(YearFilter::Exact(2021)),
            StandardFilter::Starred,
        ];
        let orders: [[usize; 4]; 4] = [[0, 1, 2, 3], [3, 2, 1, 0], [1, 3, 0, 2], [2, 0, 3, 1]];

        for subset_mask in 0u8..16 {
            let mut results = Vec::new();
            for order in &orders {
                let mut survivors: Vec<&Node> = store.nodes().iter().collect();
                for &i in order {
                    if subset_mask & (1 << i) != 0 {
                        survivors.retain(|n| filters[i].matches(n));
                    }
                }
                let mut found: Vec<&str> = survivors.iter().map(|n| n.id.as_str()).collect();
                found.sort();
                results.push(found);
            }
            assert!(results.windows(2).all(|w| w[0] == w[1]), "mask {subset_mask}");
        }
    }

    #[test]
    fn test_visible_links_subset_of_visible_nodes() {
        let mut store = sample_store();
        let overlay = overlay_for(&mut store);
        for filters in [
            FilterState::new(),
            FilterState::new().with_query("quantum").with_suggestions(true),
            FilterState::new().starred_only(),
            FilterState::new().with_suggestions(true),
        ] {
            let visible = compute_visible(&store, &overlay, &filters, &SemanticSearch::new());
            for link in &visible.links {
                assert!(visible.contains(&link.source));
                assert!(visible.contains(&link.target));
            }
        }
    }
}
