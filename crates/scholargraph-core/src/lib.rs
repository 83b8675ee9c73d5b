//! Scholargraph Core Library
//!
//! This crate provides the research graph engine behind Scholargraph:
//! - Graph store (canonical papers, notes and concepts with grouping)
//! - Suggestion overlay (AI-proposed nodes and links awaiting review)
//! - Filter and semantic search pipeline (the visible graph)
//! - Force-directed layout with drag pinning
//! - Selection and detail surface
//! - Research workspace (collaborator flows over shared state)
//! - LLM integration (OpenRouter API)

pub mod collaborator;
pub mod commands;
pub mod config;
pub mod domain;
pub mod error;
pub mod llm;
pub mod workspace;

pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::collaborator::{LlmCollaborator, ResearchCollaborator, ScriptedCollaborator};
    pub use crate::config::Config;
    pub use crate::domain::filter::{FilterState, YearFilter};
    pub use crate::domain::graph::{Badge, GraphStore, Link, Node, NodeDraft, NodeKind};
    pub use crate::domain::layout::{LayoutConfig, LayoutPhase, Vec2};
    pub use crate::domain::suggestion::SuggestionBatch;
    pub use crate::error::{Error, Result};
    pub use crate::workspace::{GraphState, ResearchWorkspace};
}
