//! Links between research nodes
//!
//! A link is a directed, labeled relation between two node ids. Storage
//! tolerates dangling endpoints; the filter pipeline drops them at render
//! time.

use serde::{Deserialize, Serialize};

/// Label used for links produced by document ingestion
pub const CONTAINS_LABEL: &str = "Contains";

/// A directed, labeled relation between two nodes
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Link {
    /// Id of the source node
    pub source: String,
    /// Id of the target node
    pub target: String,
    /// Short relation description, e.g. "Evolved To"
    pub label: String,
    /// Mirrors overlay membership
    #[serde(default)]
    pub is_suggestion: bool,
}

impl Link {
    /// Create a canonical link
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            label: label.into(),
            is_suggestion: false,
        }
    }

    /// Create a "Contains" link
    pub fn contains(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(source, target, CONTAINS_LABEL)
    }

    /// Mark the link as an overlay suggestion
    pub fn into_suggestion(mut self) -> Self {
        self.is_suggestion = true;
        self
    }

    /// Whether this link has `id` as either endpoint
    pub fn touches(&self, id: &str) -> bool {
        self.source == id || self.target == id
    }

    /// The endpoint opposite to `id`, if `id` is an endpoint
    pub fn other_end(&self, id: &str) -> Option<&str> {
        if self.source == id {
            Some(&self.target)
        } else if self.target == id {
            Some(&self.source)
        } else {
            None
        }
    }

    /// Identity ignoring overlay membership
    pub fn same_relation(&self, other: &Link) -> bool {
        self.source == other.source && self.target == other.target && self.label == other.label
    }

    /// Whether this link connects the same ordered pair as `other`
    pub fn same_pair(&self, source: &str, target: &str) -> bool {
        self.source == source && self.target == target
    }
}

/// Direction of a link relative to an inspected node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkDirection {
    /// The inspected node is the source
    Outgoing,
    /// The inspected node is the target
    Incoming,
}

impl LinkDirection {
    /// Direction of `link` as seen from `id`
    pub fn of(link: &Link, id: &str) -> Self {
        if link.source == id {
            Self::Outgoing
        } else {
            Self::Incoming
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_creation() {
        let link = Link::new("a", "b", "Evolved To");
        assert_eq!(link.source, "a");
        assert_eq!(link.target, "b");
        assert!(!link.is_suggestion);
        assert!(Link::contains("p", "c").label == CONTAINS_LABEL);
    }

    #[test]
    fn test_other_end() {
        let link = Link::new("a", "b", "Cites");
        assert_eq!(link.other_end("a"), Some("b"));
        assert_eq!(link.other_end("b"), Some("a"));
        assert_eq!(link.other_end("c"), None);
        assert!(link.touches("a"));
        assert!(!link.touches("c"));
    }

    #[test]
    fn test_same_relation_ignores_overlay_flag() {
        let canonical = Link::new("a", "b", "Cites");
        let suggested = Link::new("a", "b", "Cites").into_suggestion();
        assert!(canonical.same_relation(&suggested));
        assert_ne!(canonical, suggested);
    }

    #[test]
    fn test_direction() {
        let link = Link::new("a", "b", "Cites");
        assert_eq!(LinkDirection::of(&link, "a"), LinkDirection::Outgoing);
        assert_eq!(LinkDirection::of(&link, "b"), LinkDirection::Incoming);
    }
}
