//! JSON import/export of a research graph
//!
//! A snapshot is a plain dump of canonical nodes, canonical links and the
//! pending suggestion overlay. The CLI uses it to carry a graph between
//! invocations.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::Config;
use crate::domain::graph::{GraphStore, Link, Node};
use crate::domain::suggestion::{SuggestionBatch, SuggestionEngine};
use crate::error::{Error, Result};
use crate::workspace::GraphState;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub links: Vec<Link>,
    /// Pending suggestions, if any
    #[serde(default, skip_serializing_if = "SuggestionBatch::is_empty")]
    pub suggestions: SuggestionBatch,
}

impl GraphSnapshot {
    /// Read a snapshot from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let snapshot: Self = serde_json::from_str(&raw).map_err(|e| {
            Error::InvalidInput(format!("{} is not a graph snapshot: {}", path.display(), e))
        })?;
        debug!(path = %path.display(), nodes = snapshot.nodes.len(), "Loaded snapshot");
        Ok(snapshot)
    }

    /// Like [`GraphSnapshot::load`], but a missing file is an empty graph
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Write the snapshot as pretty JSON, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        info!(
            path = %path.display(),
            nodes = self.nodes.len(),
            links = self.links.len(),
            "Saved snapshot"
        );
        Ok(())
    }

    /// Capture canonical graph and overlay
    pub fn from_state(state: &GraphState) -> Self {
        Self {
            nodes: state.store().nodes().to_vec(),
            links: state.store().links().to_vec(),
            suggestions: SuggestionBatch::new(
                state.overlay().nodes().to_vec(),
                state.overlay().links().to_vec(),
            ),
        }
    }

    /// Rebuild engine state
    ///
    /// Nodes saved without a group are grouped with the configured rules.
    /// Duplicate node ids are rejected.
    pub fn into_state(self, config: &Config) -> Result<GraphState> {
        let mut store = GraphStore::with_rules(config.grouping.clone());
        for mut node in self.nodes {
            node.is_suggestion = false;
            if node.group.trim().is_empty() {
                node.group = store.rules().assign(node.kind, &node.badges, &node.label);
            }
            store.insert_node(node)?;
        }
        for mut link in self.links {
            link.is_suggestion = false;
            store.insert_link(link)?;
        }

        let mut overlay = SuggestionEngine::new();
        if !self.suggestions.is_empty() {
            overlay.replace_overlay(self.suggestions, &mut store);
        }

        Ok(GraphState::from_parts(store, overlay, config.layout.clone()))
    }
}
