//! Suggestion overlay and its lifecycle
//!
//! The overlay is a disposable, non-canonical collection of AI-proposed
//! nodes and links. It moves through `Idle → Generating → Populated` and is
//! drained back to `Idle` by promotions, rejections or `clear`.
//!
//! Promotion is the only way an overlay entry reaches the canonical store,
//! and it always moves a node together with every overlay link whose other
//! endpoint is already canonical.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::graph::{GraphEvent, GraphStore, Link, LinkInsertion, Node, PROMOTED_GROUP};
use crate::error::{Error, Result};

/// Lifecycle phase of the overlay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionPhase {
    /// No overlay and no request in flight
    #[default]
    Idle,
    /// A generation request is in flight
    Generating,
    /// The overlay holds suggestions awaiting review
    Populated,
}

/// Handle identifying one generation request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GenerationTicket(u64);

impl GenerationTicket {
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Raw collaborator output for a generation round
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SuggestionBatch {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub links: Vec<Link>,
}

impl SuggestionBatch {
    pub fn new(nodes: Vec<Node>, links: Vec<Link>) -> Self {
        Self { nodes, links }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.links.is_empty()
    }
}

/// Summary of an overlay replacement
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OverlayReplacement {
    pub node_count: usize,
    pub link_count: usize,
    /// `(proposed id, assigned id)` for nodes that collided with canonical ids
    pub rekeyed: Vec<(String, String)>,
    pub dropped_nodes: usize,
    pub dropped_links: usize,
}

/// Summary of a node promotion
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Promotion {
    pub node_id: String,
    pub links_promoted: usize,
    pub links_remaining: usize,
}

/// The suggestion overlay
#[derive(Debug, Clone, Default)]
pub struct SuggestionEngine {
    nodes: Vec<Node>,
    links: Vec<Link>,
    phase: SuggestionPhase,
    next_request: u64,
    latest_request: Option<u64>,
}

impl SuggestionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> SuggestionPhase {
        self.phase
    }

    pub fn is_generating(&self) -> bool {
        self.phase == SuggestionPhase::Generating
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.iter().any(|n| n.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.links.is_empty()
    }

    // ========== Generation ==========

    /// Start a generation request; any earlier in-flight request is superseded
    pub fn begin_generation(&mut self) -> GenerationTicket {
        self.next_request += 1;
        self.latest_request = Some(self.next_request);
        self.phase = SuggestionPhase::Generating;
        debug!(request_id = self.next_request, "Suggestion generation started");
        GenerationTicket(self.next_request)
    }

    /// Apply a successful generation result
    ///
    /// Returns `None` when the ticket was superseded by a newer request; the
    /// batch is discarded and the overlay left untouched.
    pub fn complete_generation(
        &mut self,
        ticket: GenerationTicket,
        batch: SuggestionBatch,
        store: &mut GraphStore,
    ) -> Option<OverlayReplacement> {
        if self.latest_request != Some(ticket.0) {
            warn!(
                request_id = ticket.0,
                latest = ?self.latest_request,
                "Discarding superseded suggestion response"
            );
            return None;
        }
        self.latest_request = None;
        Some(self.replace_overlay(batch, store))
    }

    /// Record a failed generation; the overlay is left unchanged
    pub fn fail_generation(&mut self, ticket: GenerationTicket, error: Error) -> Error {
        if self.latest_request == Some(ticket.0) {
            self.latest_request = None;
            self.phase = self.resting_phase();
        }
        warn!(request_id = ticket.0, error = %error, "Suggestion generation failed");
        error
    }

    /// Replace the whole overlay with a new batch
    ///
    /// Proposed nodes are re-flagged as suggestions. Ids colliding with the
    /// canonical store are re-keyed (and overlay links rewritten); repeated
    /// ids inside the batch keep the first node. Links must resolve within
    /// canonical ∪ overlay or they are dropped.
    pub fn replace_overlay(
        &mut self,
        batch: SuggestionBatch,
        store: &mut GraphStore,
    ) -> OverlayReplacement {
        let mut report = OverlayReplacement::default();
        let mut renames: HashMap<String, String> = HashMap::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut nodes = Vec::with_capacity(batch.nodes.len());

        for node in batch.nodes {
            let reason = node.reason.clone();
            let mut node = node.into_suggestion(reason);

            if node.id.trim().is_empty() {
                node.id = Uuid::new_v4().to_string();
            }
            if store.contains(&node.id) {
                let fresh = format!("suggestion-{}", Uuid::new_v4());
                warn!(
                    proposed = %node.id,
                    assigned = %fresh,
                    "Re-keying suggestion that collides with canonical node"
                );
                renames.insert(node.id.clone(), fresh.clone());
                report.rekeyed.push((node.id.clone(), fresh.clone()));
                node.id = fresh;
            }
            if !seen.insert(node.id.clone()) {
                debug!(node_id = %node.id, "Dropping repeated suggestion id");
                report.dropped_nodes += 1;
                continue;
            }
            nodes.push(node);
        }

        let mut links: Vec<Link> = Vec::with_capacity(batch.links.len());
        for link in batch.links {
            let mut link = link.into_suggestion();
            if let Some(renamed) = renames.get(&link.source) {
                link.source = renamed.clone();
            }
            if let Some(renamed) = renames.get(&link.target) {
                link.target = renamed.clone();
            }

            let resolves = |id: &str| seen.contains(id) || store.contains(id);
            if !resolves(&link.source) || !resolves(&link.target) {
                warn!(
                    source = %link.source,
                    target = %link.target,
                    "Dropping suggested link with unresolved endpoint"
                );
                report.dropped_links += 1;
                continue;
            }
            let duplicate = links.iter().any(|l| l.same_relation(&link))
                || store.links().iter().any(|l| l.same_relation(&link));
            if duplicate {
                report.dropped_links += 1;
                continue;
            }
            links.push(link);
        }

        report.node_count = nodes.len();
        report.link_count = links.len();
        self.nodes = nodes;
        self.links = links;
        self.phase = self.resting_phase();

        info!(
            nodes = report.node_count,
            links = report.link_count,
            rekeyed = report.rekeyed.len(),
            "Suggestion overlay replaced"
        );
        store.record(GraphEvent::SuggestionsReplaced {
            node_count: report.node_count,
            link_count: report.link_count,
            rekeyed: report.rekeyed.iter().map(|(_, new)| new.clone()).collect(),
            timestamp: Utc::now(),
        });

        report
    }

    // ========== Promotion ==========

    /// Move a suggestion node into the canonical store
    ///
    /// Every overlay link whose endpoints are now both canonical moves with
    /// it, including links between nodes that were already canonical. Links
    /// to still-suggested nodes stay in the overlay.
    pub fn promote_node(&mut self, id: &str, store: &mut GraphStore) -> Result<Promotion> {
        let position = self
            .nodes
            .iter()
            .position(|n| n.id == id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        if store.contains(id) {
            return Err(Error::DuplicateId(id.to_string()));
        }

        let mut node = self.nodes.remove(position);
        node.is_suggestion = false;
        node.group = PROMOTED_GROUP.to_string();
        node.reason = None;
        store.insert_node(node)?;

        let (promoted, remaining): (Vec<Link>, Vec<Link>) =
            std::mem::take(&mut self.links)
                .into_iter()
                .partition(|l| store.contains(&l.source) && store.contains(&l.target));
        self.links = remaining;

        let links_promoted = promoted.len();
        for mut link in promoted {
            link.is_suggestion = false;
            store.insert_link(link)?;
        }

        self.phase = self.resting_phase();
        info!(node_id = %id, links_promoted, "Promoted suggestion node");
        store.record(GraphEvent::NodePromoted {
            node_id: id.to_string(),
            links_promoted,
            timestamp: Utc::now(),
        });

        Ok(Promotion {
            node_id: id.to_string(),
            links_promoted,
            links_remaining: self.links.len(),
        })
    }

    /// Move a single overlay link between two canonical nodes into the store
    pub fn promote_link(&mut self, link: &Link, store: &mut GraphStore) -> Result<LinkInsertion> {
        let position = self
            .links
            .iter()
            .position(|l| l.same_relation(link))
            .ok_or_else(|| Error::NotFound(format!("{} -> {}", link.source, link.target)))?;

        store.validate_link(&self.links[position])?;

        let mut promoted = self.links.remove(position);
        promoted.is_suggestion = false;
        store.record(GraphEvent::LinkPromoted {
            source_id: promoted.source.clone(),
            target_id: promoted.target.clone(),
            timestamp: Utc::now(),
        });
        let outcome = store.insert_link(promoted)?;

        self.phase = self.resting_phase();
        Ok(outcome)
    }

    // ========== Discard ==========

    /// Discard a suggestion node and every overlay link touching it
    pub fn reject_node(&mut self, id: &str, store: &mut GraphStore) -> Result<usize> {
        let position = self
            .nodes
            .iter()
            .position(|n| n.id == id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        self.nodes.remove(position);

        let before = self.links.len();
        self.links.retain(|l| !l.touches(id));
        let links_removed = before - self.links.len();

        self.phase = self.resting_phase();
        store.record(GraphEvent::SuggestionRejected {
            node_id: Some(id.to_string()),
            links_removed,
            timestamp: Utc::now(),
        });
        Ok(links_removed)
    }

    /// Discard a single overlay link
    pub fn reject_link(&mut self, link: &Link, store: &mut GraphStore) -> Result<()> {
        let position = self
            .links
            .iter()
            .position(|l| l.same_relation(link))
            .ok_or_else(|| Error::NotFound(format!("{} -> {}", link.source, link.target)))?;
        self.links.remove(position);

        self.phase = self.resting_phase();
        store.record(GraphEvent::SuggestionRejected {
            node_id: None,
            links_removed: 1,
            timestamp: Utc::now(),
        });
        Ok(())
    }

    /// Drop the whole overlay
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.links.clear();
        if self.phase != SuggestionPhase::Generating {
            self.phase = SuggestionPhase::Idle;
        }
    }

    fn resting_phase(&self) -> SuggestionPhase {
        if self.latest_request.is_some() {
            SuggestionPhase::Generating
        } else if self.is_empty() {
            SuggestionPhase::Idle
        } else {
            SuggestionPhase::Populated
        }
    }
}
