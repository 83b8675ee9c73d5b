//! Research workspace
//!
//! Shares one [`GraphState`] between callers, the layout driver and the
//! collaborator flows. Each async flow snapshots what it needs under the
//! lock, awaits the collaborator with the lock released, then applies the
//! reply in a single write.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{Notify, RwLock, RwLockReadGuard};
use tracing::{info, warn};

use crate::collaborator::{DocumentSource, ImageSource, ResearchCollaborator};
use crate::config::Config;
use crate::domain::graph::{NodeDraft, NodeKind};
use crate::domain::layout::LayoutDriver;
use crate::domain::suggestion::OverlayReplacement;
use crate::error::{Error, Result};

use super::state::{ConnectReport, GraphState, IngestReport};

/// Minimum canonical nodes for suggestion generation and Connect
pub const MIN_NODES_FOR_GENERATION: usize = 2;

/// Result of a semantic search round-trip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SearchOutcome {
    /// Results applied; `matches` nodes are now visible
    Applied { matches: usize },
    /// A newer search started before this one returned
    Superseded,
    /// Blank query; semantic mode was turned off
    Cleared,
}

pub struct ResearchWorkspace<C: ResearchCollaborator> {
    state: Arc<RwLock<GraphState>>,
    collaborator: Arc<C>,
    wake: Arc<Notify>,
}

impl<C: ResearchCollaborator> Clone for ResearchWorkspace<C> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            collaborator: Arc::clone(&self.collaborator),
            wake: Arc::clone(&self.wake),
        }
    }
}

impl<C: ResearchCollaborator + 'static> ResearchWorkspace<C> {
    pub fn new(state: GraphState, collaborator: C) -> Self {
        Self {
            state: Arc::new(RwLock::new(state)),
            collaborator: Arc::new(collaborator),
            wake: Arc::new(Notify::new()),
        }
    }

    /// Empty workspace configured from `config`
    pub fn with_config(config: &Config, collaborator: C) -> Self {
        Self::new(GraphState::new(config), collaborator)
    }

    pub fn collaborator(&self) -> &C {
        &self.collaborator
    }

    /// Read access to the current state
    pub async fn read(&self) -> RwLockReadGuard<'_, GraphState> {
        self.state.read().await
    }

    /// Apply a synchronous mutation under the write lock and wake the layout
    pub async fn mutate<T>(&self, f: impl FnOnce(&mut GraphState) -> T) -> T {
        let out = {
            let mut state = self.state.write().await;
            f(&mut state)
        };
        self.wake.notify_one();
        out
    }

    /// Tick the layout in the background until the workspace is dropped
    pub fn spawn_layout_driver(&self, frame: Duration) -> LayoutDriver {
        LayoutDriver::spawn(Arc::clone(&self.state), Arc::clone(&self.wake), frame)
    }

    /// Take the state back out, if no other handle shares it
    pub fn into_state(self) -> Option<GraphState> {
        Arc::try_unwrap(self.state).ok().map(RwLock::into_inner)
    }

    // ========== Collaborator flows ==========

    /// Ask for new suggestions and replace the overlay
    ///
    /// Returns `None` when a newer generation superseded this one.
    pub async fn generate_suggestions(&self) -> Result<Option<OverlayReplacement>> {
        let (ticket, nodes) = {
            let mut state = self.state.write().await;
            ensure_enough_nodes(state.store().len())?;
            (state.begin_generation(), state.canonical_nodes())
        };
        info!(nodes = nodes.len(), "Requesting suggestions");

        match self.collaborator.generate_suggestions(&nodes).await {
            Ok(batch) => Ok(self.mutate(|s| s.complete_generation(ticket, batch)).await),
            Err(error) => Err(self.mutate(|s| s.fail_generation(ticket, error)).await),
        }
    }

    /// Run a semantic search; a blank query leaves semantic mode
    pub async fn semantic_search(&self, query: &str) -> Result<SearchOutcome> {
        let query = query.trim();
        if query.is_empty() {
            self.mutate(|s| s.clear_search()).await;
            return Ok(SearchOutcome::Cleared);
        }

        let (ticket, nodes) = {
            let mut state = self.state.write().await;
            (state.begin_search(query), state.all_nodes())
        };

        match self.collaborator.semantic_search(query, &nodes).await {
            Ok(ids) => {
                let outcome = self
                    .mutate(|s| {
                        if s.resolve_search(ticket, ids) {
                            SearchOutcome::Applied {
                                matches: s.visible().nodes.len(),
                            }
                        } else {
                            SearchOutcome::Superseded
                        }
                    })
                    .await;
                Ok(outcome)
            }
            Err(error) => Err(self.mutate(|s| s.fail_search(ticket, error)).await),
        }
    }

    /// Connect action: merge collaborator-proposed links into the canonical graph
    pub async fn auto_connect(&self) -> Result<ConnectReport> {
        let nodes = {
            let state = self.state.read().await;
            ensure_enough_nodes(state.store().len())?;
            state.canonical_nodes()
        };
        info!(nodes = nodes.len(), "Requesting links");

        let proposed = self.collaborator.generate_links(&nodes).await.map_err(|e| {
            warn!(error = %e, "Link generation failed");
            e
        })?;
        self.mutate(|s| s.merge_links(proposed)).await
    }

    /// Parse a document and add it as a paper with its elements
    pub async fn ingest_document(&self, document: &DocumentSource) -> Result<IngestReport> {
        if document.text.trim().is_empty() {
            return Err(Error::InvalidInput(format!(
                "document '{}' is empty",
                document.name
            )));
        }
        let parsed = self.collaborator.parse_document(document).await?;
        self.mutate(|s| s.ingest_document(&document.name, parsed))
            .await
    }

    /// Describe an image and store the description as a new note
    pub async fn add_image_note(&self, image: &ImageSource) -> Result<String> {
        let analysis = self.collaborator.analyze_image(image).await?;
        let draft = NodeDraft::new(format!("Figure: {}", image.name), NodeKind::Note)
            .with_content(analysis);
        let id = self.mutate(|s| s.add_node(draft)).await?;
        info!(node_id = %id, image = %image.name, "Added image note");
        Ok(id)
    }

    /// Ask a question about the visible graph; nothing is mutated
    pub async fn chat(&self, query: &str) -> Result<String> {
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::InvalidInput("question must not be empty".into()));
        }
        let nodes = self.state.read().await.visible().nodes.clone();
        self.collaborator.chat(query, &nodes).await
    }
}

fn ensure_enough_nodes(found: usize) -> Result<()> {
    if found < MIN_NODES_FOR_GENERATION {
        return Err(Error::EmptyGraph {
            required: MIN_NODES_FOR_GENERATION,
            found,
        });
    }
    Ok(())
}
