//! Domain events for the research graph
//!
//! Every mutation of the canonical graph or the suggestion overlay records
//! an event. Events form an audit trail the shell can display or export.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::node::NodeKind;

/// Events that can occur in the research graph
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum GraphEvent {
    /// A canonical node was inserted
    NodeInserted {
        node_id: String,
        kind: NodeKind,
        group: String,
        timestamp: DateTime<Utc>,
    },
    /// A node's label or content changed
    NodeUpdated {
        node_id: String,
        changes: Vec<String>,
        timestamp: DateTime<Utc>,
    },
    /// A node's star was toggled
    NodeStarred {
        node_id: String,
        starred: bool,
        timestamp: DateTime<Utc>,
    },
    /// A canonical node was deleted together with its links
    NodeRemoved {
        node_id: String,
        links_removed: usize,
        timestamp: DateTime<Utc>,
    },
    /// A canonical link was inserted
    LinkInserted {
        source_id: String,
        target_id: String,
        label: String,
        dangling: bool,
        timestamp: DateTime<Utc>,
    },
    /// The suggestion overlay was replaced
    SuggestionsReplaced {
        node_count: usize,
        link_count: usize,
        rekeyed: Vec<String>,
        timestamp: DateTime<Utc>,
    },
    /// A suggestion node moved into the canonical graph
    NodePromoted {
        node_id: String,
        links_promoted: usize,
        timestamp: DateTime<Utc>,
    },
    /// A suggestion link moved into the canonical graph
    LinkPromoted {
        source_id: String,
        target_id: String,
        timestamp: DateTime<Utc>,
    },
    /// A suggestion was discarded
    SuggestionRejected {
        node_id: Option<String>,
        links_removed: usize,
        timestamp: DateTime<Utc>,
    },
    /// A semantic search result was applied
    SemanticSearchApplied {
        query: String,
        result_count: usize,
        timestamp: DateTime<Utc>,
    },
}

impl GraphEvent {
    /// Get the timestamp of the event
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::NodeInserted { timestamp, .. }
            | Self::NodeUpdated { timestamp, .. }
            | Self::NodeStarred { timestamp, .. }
            | Self::NodeRemoved { timestamp, .. }
            | Self::LinkInserted { timestamp, .. }
            | Self::SuggestionsReplaced { timestamp, .. }
            | Self::NodePromoted { timestamp, .. }
            | Self::LinkPromoted { timestamp, .. }
            | Self::SuggestionRejected { timestamp, .. }
            | Self::SemanticSearchApplied { timestamp, .. } => *timestamp,
        }
    }

    /// Get the event type name
    pub fn event_type_name(&self) -> &'static str {
        match self {
            Self::NodeInserted { .. } => "node_inserted",
            Self::NodeUpdated { .. } => "node_updated",
            Self::NodeStarred { .. } => "node_starred",
            Self::NodeRemoved { .. } => "node_removed",
            Self::LinkInserted { .. } => "link_inserted",
            Self::SuggestionsReplaced { .. } => "suggestions_replaced",
            Self::NodePromoted { .. } => "node_promoted",
            Self::LinkPromoted { .. } => "link_promoted",
            Self::SuggestionRejected { .. } => "suggestion_rejected",
            Self::SemanticSearchApplied { .. } => "semantic_search_applied",
        }
    }

    /// Get the node this event is about, if any
    pub fn node_id(&self) -> Option<&str> {
        match self {
            Self::NodeInserted { node_id, .. }
            | Self::NodeUpdated { node_id, .. }
            | Self::NodeStarred { node_id, .. }
            | Self::NodeRemoved { node_id, .. }
            | Self::NodePromoted { node_id, .. } => Some(node_id),
            Self::LinkInserted { source_id, .. } | Self::LinkPromoted { source_id, .. } => {
                Some(source_id)
            }
            Self::SuggestionRejected { node_id, .. } => node_id.as_deref(),
            Self::SuggestionsReplaced { .. } | Self::SemanticSearchApplied { .. } => None,
        }
    }

    pub fn node_inserted(
        node_id: impl Into<String>,
        kind: NodeKind,
        group: impl Into<String>,
    ) -> Self {
        Self::NodeInserted {
            node_id: node_id.into(),
            kind,
            group: group.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn node_updated(node_id: impl Into<String>, changes: Vec<String>) -> Self {
        Self::NodeUpdated {
            node_id: node_id.into(),
            changes,
            timestamp: Utc::now(),
        }
    }

    pub fn link_inserted(
        source_id: impl Into<String>,
        target_id: impl Into<String>,
        label: impl Into<String>,
        dangling: bool,
    ) -> Self {
        Self::LinkInserted {
            source_id: source_id.into(),
            target_id: target_id.into(),
            label: label.into(),
            dangling,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_creation() {
        let event = GraphEvent::node_inserted("n-1", NodeKind::Paper, "General AI");
        assert_eq!(event.event_type_name(), "node_inserted");
        assert_eq!(event.node_id(), Some("n-1"));
    }

    #[test]
    fn test_event_serializes_with_tag() {
        let event = GraphEvent::link_inserted("a", "b", "Cites", false);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event_type"], "link_inserted");
        assert_eq!(json["source_id"], "a");
    }
}
