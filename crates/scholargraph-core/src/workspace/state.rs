//! Aggregate engine state behind the workspace lock
//!
//! Every synchronous mutation goes through [`GraphState`], which recomputes
//! the visible set and hands it to the layout before returning. Callers never
//! observe a visible set that lags behind the store or the overlay.

use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::collaborator::ParsedDocument;
use crate::config::Config;
use crate::domain::filter::{
    FilterState, SearchTicket, SemanticSearch, VisibleGraph, YearFilter, compute_visible,
};
use crate::domain::graph::{
    GraphStore, GroupingRules, Link, LinkInsertion, Node, NodeDraft, NodeKind,
};
use crate::domain::layout::{LayoutConfig, LayoutHost, LayoutSimulation, Vec2};
use crate::domain::selection::{RelatedLink, SelectionSurface, related_links};
use crate::domain::suggestion::{
    GenerationTicket, OverlayReplacement, Promotion, SuggestionBatch, SuggestionEngine,
};
use crate::error::{Error, Result};

/// Outcome of merging collaborator-proposed links
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConnectReport {
    pub proposed: usize,
    pub added: usize,
    /// Pairs already linked, or repeated within the proposal
    pub duplicates: usize,
    /// Links with an endpoint outside the canonical graph
    pub skipped: usize,
}

/// Nodes created from one document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub parent_id: String,
    pub child_ids: Vec<String>,
}

#[derive(Debug, Default)]
pub struct GraphState {
    store: GraphStore,
    overlay: SuggestionEngine,
    filters: FilterState,
    semantic: SemanticSearch,
    layout: LayoutSimulation,
    selection: SelectionSurface,
    visible: VisibleGraph,
}

impl GraphState {
    pub fn new(config: &Config) -> Self {
        Self::from_parts(
            GraphStore::with_rules(config.grouping.clone()),
            SuggestionEngine::new(),
            config.layout.clone(),
        )
    }

    /// Build state around an existing store and overlay
    pub fn from_parts(store: GraphStore, overlay: SuggestionEngine, layout: LayoutConfig) -> Self {
        let mut state = Self {
            store,
            overlay,
            filters: FilterState::default(),
            semantic: SemanticSearch::new(),
            layout: LayoutSimulation::new(layout),
            selection: SelectionSurface::new(),
            visible: VisibleGraph::default(),
        };
        state.refresh();
        state
    }

    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    pub fn overlay(&self) -> &SuggestionEngine {
        &self.overlay
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    pub fn semantic(&self) -> &SemanticSearch {
        &self.semantic
    }

    pub fn layout(&self) -> &LayoutSimulation {
        &self.layout
    }

    pub fn selection(&self) -> &SelectionSurface {
        &self.selection
    }

    pub fn visible(&self) -> &VisibleGraph {
        &self.visible
    }

    /// Recompute the visible set and feed it to the layout
    ///
    /// Returns whether the layout was reheated.
    pub fn refresh(&mut self) -> bool {
        self.visible = compute_visible(&self.store, &self.overlay, &self.filters, &self.semantic);
        let reheated = self.layout.set_graph(&self.visible.nodes, &self.visible.links);
        self.selection.prune(&self.store, &self.overlay);
        debug!(
            nodes = self.visible.nodes.len(),
            links = self.visible.links.len(),
            reheated,
            "Visible set recomputed"
        );
        reheated
    }

    fn refreshed<T>(&mut self, result: Result<T>) -> Result<T> {
        if result.is_ok() {
            self.refresh();
        }
        result
    }

    // ========== Canonical graph ==========

    /// Insert a canonical node; ids are unique across store and overlay
    pub fn insert_node(&mut self, node: Node) -> Result<()> {
        if self.overlay.contains(&node.id) {
            return Err(Error::DuplicateId(node.id));
        }
        let result = self.store.insert_node(node);
        self.refreshed(result)
    }

    pub fn add_node(&mut self, draft: NodeDraft) -> Result<String> {
        if let Some(id) = &draft.id
            && self.overlay.contains(id)
        {
            return Err(Error::DuplicateId(id.clone()));
        }
        let result = self.store.add_node(draft);
        self.refreshed(result)
    }

    pub fn insert_link(&mut self, link: Link) -> Result<LinkInsertion> {
        let result = self.store.insert_link(link);
        self.refreshed(result)
    }

    pub fn remove_node(&mut self, id: &str) -> Result<Node> {
        let result = self.store.remove_node(id);
        self.refreshed(result)
    }

    pub fn toggle_star(&mut self, id: &str) -> Result<bool> {
        let result = self.store.toggle_star(id);
        self.refreshed(result)
    }

    /// Swap the grouping rules and regroup every canonical node
    pub fn set_rules(&mut self, rules: GroupingRules) -> usize {
        self.store.set_rules(rules);
        let changed = self.store.regroup_all();
        self.refresh();
        changed
    }

    /// Canonical nodes, cloned for a collaborator round-trip
    pub fn canonical_nodes(&self) -> Vec<Node> {
        self.store.nodes().to_vec()
    }

    /// Canonical and overlay nodes, the context for semantic search
    pub fn all_nodes(&self) -> Vec<Node> {
        self.store
            .nodes()
            .iter()
            .chain(self.overlay.nodes())
            .cloned()
            .collect()
    }

    /// Merge proposed relations straight into the canonical graph
    ///
    /// Pairs already linked (or repeated in the proposal) are skipped, as are
    /// links whose endpoints are not both canonical.
    pub fn merge_links(&mut self, proposed: Vec<Link>) -> Result<ConnectReport> {
        let mut report = ConnectReport {
            proposed: proposed.len(),
            ..Default::default()
        };
        let mut seen: HashSet<(String, String)> = HashSet::new();

        for mut link in proposed {
            if link.source == link.target
                || !self.store.contains(&link.source)
                || !self.store.contains(&link.target)
            {
                warn!(
                    source = %link.source,
                    target = %link.target,
                    "Skipping proposed link with non-canonical endpoint"
                );
                report.skipped += 1;
                continue;
            }
            let pair = (link.source.clone(), link.target.clone());
            if self.store.contains_link_pair(&pair.0, &pair.1) || !seen.insert(pair) {
                report.duplicates += 1;
                continue;
            }
            link.is_suggestion = false;
            self.store.insert_link(link)?;
            report.added += 1;
        }

        if report.added > 0 {
            self.refresh();
        }
        info!(
            proposed = report.proposed,
            added = report.added,
            duplicates = report.duplicates,
            skipped = report.skipped,
            "Merged proposed links"
        );
        Ok(report)
    }

    /// Insert a parsed document as a parent paper with one child per element
    pub fn ingest_document(&mut self, name: &str, parsed: ParsedDocument) -> Result<IngestReport> {
        let title = parsed
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(name)
            .to_string();
        if title.trim().is_empty() {
            return Err(Error::InvalidInput("document has no title or name".into()));
        }

        let parent_id = self
            .store
            .add_node(NodeDraft::new(title, NodeKind::Paper).with_content(parsed.summary))?;

        let mut child_ids = Vec::new();
        for element in parsed.elements {
            if element.label.trim().is_empty() {
                continue;
            }
            let kind = NodeKind::parse(&element.kind).unwrap_or(NodeKind::Concept);
            let child_id = self
                .store
                .add_node(NodeDraft::new(element.label, kind).with_content(element.content))?;
            self.store
                .insert_link(Link::contains(parent_id.as_str(), child_id.as_str()))?;
            child_ids.push(child_id);
        }

        self.refresh();
        info!(node_id = %parent_id, children = child_ids.len(), "Ingested document");
        Ok(IngestReport {
            parent_id,
            child_ids,
        })
    }

    // ========== Suggestion overlay ==========

    pub fn begin_generation(&mut self) -> GenerationTicket {
        self.overlay.begin_generation()
    }

    pub fn complete_generation(
        &mut self,
        ticket: GenerationTicket,
        batch: SuggestionBatch,
    ) -> Option<OverlayReplacement> {
        let report = self
            .overlay
            .complete_generation(ticket, batch, &mut self.store)?;
        self.refresh();
        Some(report)
    }

    pub fn fail_generation(&mut self, ticket: GenerationTicket, error: Error) -> Error {
        self.overlay.fail_generation(ticket, error)
    }

    pub fn promote_node(&mut self, id: &str) -> Result<Promotion> {
        let result = self.overlay.promote_node(id, &mut self.store);
        self.refreshed(result)
    }

    pub fn promote_link(&mut self, link: &Link) -> Result<LinkInsertion> {
        let result = self.overlay.promote_link(link, &mut self.store);
        self.refreshed(result)
    }

    pub fn reject_node(&mut self, id: &str) -> Result<usize> {
        let result = self.overlay.reject_node(id, &mut self.store);
        self.refreshed(result)
    }

    pub fn reject_link(&mut self, link: &Link) -> Result<()> {
        let result = self.overlay.reject_link(link, &mut self.store);
        self.refreshed(result)
    }

    pub fn clear_suggestions(&mut self) {
        self.overlay.clear();
        self.refresh();
    }

    // ========== Filters and search ==========

    pub fn set_filters(&mut self, filters: FilterState) {
        self.filters = filters;
        self.refresh();
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.filters.query = query.into();
        self.refresh();
    }

    pub fn set_partition(&mut self, partition: Option<String>) {
        self.filters.partition = partition;
        self.refresh();
    }

    pub fn set_year(&mut self, year: YearFilter) {
        self.filters.year = year;
        self.refresh();
    }

    pub fn set_starred_only(&mut self, starred_only: bool) {
        self.filters.starred_only = starred_only;
        self.refresh();
    }

    pub fn set_show_suggestions(&mut self, show: bool) {
        self.filters.show_suggestions = show;
        self.refresh();
    }

    pub fn clear_filters(&mut self) {
        self.filters.clear();
        self.refresh();
    }

    pub fn begin_search(&mut self, query: impl Into<String>) -> SearchTicket {
        self.semantic.begin(query)
    }

    /// Apply search results; `false` if the ticket was superseded
    pub fn resolve_search(&mut self, ticket: SearchTicket, ids: Vec<String>) -> bool {
        let applied = self.semantic.resolve(ticket, ids);
        if applied {
            self.refresh();
        }
        applied
    }

    pub fn fail_search(&mut self, ticket: SearchTicket, error: Error) -> Error {
        self.semantic.fail(ticket, error)
    }

    /// Leave semantic mode and return to the standard filters
    pub fn clear_search(&mut self) {
        self.semantic.clear();
        self.refresh();
    }

    // ========== Selection ==========

    pub fn select(&mut self, id: &str) -> Result<()> {
        self.selection.select(id, &self.store, &self.overlay)
    }

    pub fn deselect(&mut self) {
        self.selection.deselect();
    }

    pub fn selected_node(&self) -> Option<&Node> {
        self.selection.selected_node(&self.store, &self.overlay)
    }

    pub fn edit_label(&mut self, id: &str, label: &str) -> Result<()> {
        let result = self.selection.edit_label(&mut self.store, id, label);
        self.refreshed(result)
    }

    pub fn edit_content(&mut self, id: &str, content: &str) -> Result<()> {
        let result = self.selection.edit_content(&mut self.store, id, content);
        self.refreshed(result)
    }

    /// Visible links around `id`
    pub fn related_links(&self, id: &str) -> Vec<RelatedLink> {
        related_links(id, &self.visible)
    }

    // ========== Layout ==========

    pub fn drag_start(&mut self, id: &str, at: Vec2) -> Result<()> {
        self.layout.drag_start(id, at)
    }

    pub fn drag_move(&mut self, at: Vec2) -> bool {
        self.layout.drag_move(at)
    }

    pub fn drag_end(&mut self) -> Option<String> {
        self.layout.drag_end()
    }

    pub fn set_layout_config(&mut self, config: LayoutConfig) {
        self.layout.set_config(config);
    }

    /// Tick until settled, for headless callers
    pub fn settle(&mut self, max_ticks: usize) -> usize {
        self.layout.run_until_settled(max_ticks)
    }
}

impl LayoutHost for GraphState {
    fn layout_mut(&mut self) -> &mut LayoutSimulation {
        &mut self.layout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborator::DocumentElement;
    use crate::domain::graph::CONTAINS_LABEL;
    use crate::domain::layout::LayoutPhase;

    fn state_with(ids: &[&str]) -> GraphState {
        let mut state = GraphState::default();
        for id in ids {
            state
                .insert_node(Node::new(format!("Paper {id}"), NodeKind::Paper).with_id(*id))
                .unwrap();
        }
        state
    }

    #[test]
    fn test_mutation_updates_visible_and_layout() {
        let mut state = state_with(&["A", "B"]);
        assert_eq!(state.visible().nodes.len(), 2);
        assert_eq!(state.layout().len(), 2);

        state.insert_link(Link::new("A", "B", "Cites")).unwrap();
        assert_eq!(state.visible().links.len(), 1);
        assert!(!state.layout().is_settled());
    }

    #[test]
    fn test_failed_mutation_leaves_visible_set() {
        let mut state = state_with(&["A"]);
        state.settle(5_000);
        assert!(state.layout().is_settled());

        let err = state
            .insert_node(Node::new("Other", NodeKind::Note).with_id("A"))
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateId(_)));
        assert!(state.layout().is_settled());
    }

    #[test]
    fn test_canonical_insert_rejects_pending_suggestion_id() {
        let mut state = state_with(&["A", "B"]);
        let ticket = state.begin_generation();
        state.complete_generation(
            ticket,
            SuggestionBatch::new(
                vec![Node::new("Idea", NodeKind::Concept).with_id("S")],
                vec![Link::new("A", "S", "Related")],
            ),
        );

        let err = state
            .add_node(NodeDraft::new("Manual", NodeKind::Note).with_id("S"))
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateId(ref id) if id == "S"));
        let err = state
            .insert_node(Node::new("Manual", NodeKind::Note).with_id("S"))
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateId(_)));

        state.set_show_suggestions(true);
        let with_s = state.visible().nodes.iter().filter(|n| n.id == "S").count();
        assert_eq!(with_s, 1);

        state.promote_node("S").unwrap();
        assert!(state.store().contains("S"));
        assert!(!state.overlay().contains("S"));
    }

    #[test]
    fn test_filter_change_reheats_only_when_visible_set_changes() {
        let mut state = state_with(&["A", "B"]);
        state.settle(5_000);

        state.set_query("paper");
        assert!(state.layout().is_settled(), "same visible set, no reheat");

        state.set_query("paper A");
        assert_eq!(state.visible().node_ids(), vec!["A"]);
        assert_eq!(*state.layout().phase(), LayoutPhase::Settling);
    }

    #[test]
    fn test_selection_pruned_when_node_removed() {
        let mut state = state_with(&["A", "B"]);
        state.select("A").unwrap();
        state.remove_node("A").unwrap();
        assert_eq!(state.selection().selected(), None);
    }

    #[test]
    fn test_semantic_results_override_filters() {
        let mut state = state_with(&["A", "B", "C"]);
        state.set_starred_only(true);
        assert!(state.visible().is_empty());

        let ticket = state.begin_search("anything");
        assert!(state.resolve_search(ticket, vec!["B".into()]));
        assert_eq!(state.visible().node_ids(), vec!["B"]);

        state.clear_search();
        assert!(state.visible().is_empty());
    }

    #[test]
    fn test_promotion_makes_node_editable() {
        let mut state = state_with(&["A"]);
        state.set_show_suggestions(true);
        let ticket = state.begin_generation();
        let batch = SuggestionBatch::new(
            vec![Node::new("Idea", NodeKind::Concept).with_id("S")],
            vec![Link::new("A", "S", "Extends")],
        );
        state.complete_generation(ticket, batch).unwrap();
        assert!(state.visible().contains("S"));
        assert!(matches!(
            state.edit_label("S", "Renamed"),
            Err(Error::NotFound(_))
        ));

        state.promote_node("S").unwrap();
        state.edit_label("S", "Renamed").unwrap();
        assert_eq!(state.store().node("S").unwrap().label, "Renamed");
        assert_eq!(state.related_links("S").len(), 1);
    }

    #[test]
    fn test_merge_links_dedupes_and_skips() {
        let mut state = state_with(&["A", "B", "C"]);
        state.insert_link(Link::new("A", "B", "Cites")).unwrap();

        let report = state
            .merge_links(vec![
                Link::new("A", "B", "Extends"),
                Link::new("B", "C", "Uses"),
                Link::new("B", "C", "Uses again"),
                Link::new("C", "ghost", "Related"),
                Link::new("A", "A", "Self"),
            ])
            .unwrap();

        assert_eq!(
            report,
            ConnectReport {
                proposed: 5,
                added: 1,
                duplicates: 2,
                skipped: 2,
            }
        );
        assert_eq!(state.store().link_count(), 2);
        assert!(state.store().links().iter().all(|l| !l.is_suggestion));
    }

    #[test]
    fn test_ingest_document_builds_parent_and_children() {
        let mut state = GraphState::default();
        let parsed = ParsedDocument {
            title: None,
            summary: "A survey of ensembles".into(),
            elements: vec![
                DocumentElement {
                    kind: "method".into(),
                    label: "Bagging".into(),
                    content: "Bootstrap aggregation".into(),
                },
                DocumentElement {
                    kind: "paper".into(),
                    label: "Breiman 1996".into(),
                    content: String::new(),
                },
                DocumentElement {
                    kind: "concept".into(),
                    label: "  ".into(),
                    content: "ignored".into(),
                },
            ],
        };

        let report = state.ingest_document("survey.pdf", parsed).unwrap();
        assert_eq!(report.child_ids.len(), 2);

        let parent = state.store().node(&report.parent_id).unwrap();
        assert_eq!(parent.label, "survey.pdf");
        assert_eq!(parent.kind, NodeKind::Paper);
        assert_eq!(parent.content, "A survey of ensembles");

        let bagging = state.store().node(&report.child_ids[0]).unwrap();
        assert_eq!(bagging.kind, NodeKind::Concept);
        assert_eq!(state.store().node(&report.child_ids[1]).unwrap().kind, NodeKind::Paper);

        assert_eq!(state.store().link_count(), 2);
        assert!(
            state
                .store()
                .links()
                .iter()
                .all(|l| l.source == report.parent_id && l.label == CONTAINS_LABEL)
        );
        assert_eq!(state.visible().nodes.len(), 3);
    }

    #[test]
    fn test_drag_through_state() {
        let mut state = state_with(&["A", "B"]);
        state.drag_start("A", Vec2::new(10.0, 20.0)).unwrap();
        assert!(state.drag_move(Vec2::new(30.0, 40.0)));
        assert_eq!(state.drag_end().as_deref(), Some("A"));
        assert_eq!(state.layout().position("A"), Some(Vec2::new(30.0, 40.0)));
    }
}
