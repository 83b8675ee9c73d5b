//! Collaborator boundary and its payload types

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::graph::{Link, Node};
use crate::domain::suggestion::SuggestionBatch;
use crate::error::{Error, Result};

/// External AI collaborator used by the research workspace
///
/// Every call is a single round-trip. Failures must be reported as errors
/// for which [`Error::is_collaborator_failure`] holds; the engine leaves its
/// state untouched when a call fails.
#[async_trait]
pub trait ResearchCollaborator: Send + Sync {
    /// Propose relations between existing canonical nodes
    async fn generate_links(&self, nodes: &[Node]) -> Result<Vec<Link>>;

    /// Propose new nodes and the links that connect them
    async fn generate_suggestions(&self, nodes: &[Node]) -> Result<SuggestionBatch>;

    /// Ids of the nodes that match `query`; an empty list means no matches
    async fn semantic_search(&self, query: &str, nodes: &[Node]) -> Result<Vec<String>>;

    /// Answer a question using the given nodes as context
    async fn chat(&self, query: &str, nodes: &[Node]) -> Result<String>;

    /// Split a document into a summary and its elements
    async fn parse_document(&self, document: &DocumentSource) -> Result<ParsedDocument>;

    /// Describe an image as note content
    async fn analyze_image(&self, image: &ImageSource) -> Result<String>;
}

/// A text document handed to the collaborator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSource {
    /// File name, used as the fallback title
    pub name: String,
    pub text: String,
}

impl DocumentSource {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::new(file_name(path), text))
    }
}

/// An image handed to the collaborator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSource {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl ImageSource {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let mime_type = mime_for_path(path).ok_or_else(|| {
            Error::InvalidInput(format!(
                "unsupported image type: {} (expected png, jpg, gif or webp)",
                path.display()
            ))
        })?;
        let bytes = std::fs::read(path)?;
        Ok(Self::new(file_name(path), mime_type, bytes))
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

/// One element extracted from a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentElement {
    /// Collaborator-provided kind, e.g. "method" or "concept"
    #[serde(rename = "type", default)]
    pub kind: String,
    pub label: String,
    #[serde(default)]
    pub content: String,
}

/// Result of parsing a document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedDocument {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub elements: Vec<DocumentElement>,
}
