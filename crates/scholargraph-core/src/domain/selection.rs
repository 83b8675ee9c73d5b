//! Selection and detail surface
//!
//! Tracks the node under inspection and resolves the links around it for
//! display. Edits are written through to the graph store; suggestion nodes
//! can be inspected but not edited until promoted.

use serde::Serialize;

use crate::domain::filter::VisibleGraph;
use crate::domain::graph::{GraphStore, Link, LinkDirection, Node};
use crate::domain::suggestion::SuggestionEngine;
use crate::error::{Error, Result};

/// A visible link seen from one of its endpoints
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelatedLink {
    pub link: Link,
    pub direction: LinkDirection,
    /// The node at the other end
    pub other: Node,
}

#[derive(Debug, Clone, Default)]
pub struct SelectionSurface {
    selected: Option<String>,
}

impl SelectionSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the active node; the graph itself is not touched
    pub fn select(
        &mut self,
        id: &str,
        store: &GraphStore,
        overlay: &SuggestionEngine,
    ) -> Result<()> {
        if !store.contains(id) && !overlay.contains(id) {
            return Err(Error::NotFound(id.to_string()));
        }
        self.selected = Some(id.to_string());
        Ok(())
    }

    pub fn deselect(&mut self) {
        self.selected = None;
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Resolve the selected node from the store or the overlay
    pub fn selected_node<'a>(
        &self,
        store: &'a GraphStore,
        overlay: &'a SuggestionEngine,
    ) -> Option<&'a Node> {
        let id = self.selected.as_deref()?;
        store.node(id).or_else(|| overlay.node(id))
    }

    /// Drop the selection if its node no longer exists
    pub fn prune(&mut self, store: &GraphStore, overlay: &SuggestionEngine) {
        if let Some(id) = self.selected.as_deref()
            && !store.contains(id)
            && !overlay.contains(id)
        {
            self.selected = None;
        }
    }

    pub fn edit_label(&self, store: &mut GraphStore, id: &str, label: &str) -> Result<()> {
        store.update_node_content(id, Some(label), None)
    }

    pub fn edit_content(&self, store: &mut GraphStore, id: &str, content: &str) -> Result<()> {
        store.update_node_content(id, None, Some(content))
    }
}

/// Every visible link touching `id`, with direction and the other node
pub fn related_links(id: &str, visible: &VisibleGraph) -> Vec<RelatedLink> {
    visible
        .links
        .iter()
        .filter_map(|link| {
            let other_id = link.other_end(id)?;
            let other = visible.node(other_id)?;
            Some(RelatedLink {
                link: link.clone(),
                direction: LinkDirection::of(link, id),
                other: other.clone(),
            })
        })
        .collect()
}
