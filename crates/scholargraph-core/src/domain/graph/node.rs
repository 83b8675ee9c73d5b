//! Node types for the research graph
//!
//! A node is a paper, a free-form note, or a derived concept. Canonical
//! nodes and suggestion nodes share this one type; overlay membership is
//! carried by the `is_suggestion` flag so promotion is a move, not a rebuild.

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A node in the research graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique identifier, immutable once assigned
    pub id: String,
    /// Display title
    pub label: String,
    /// Kind of node, fixed at creation
    pub kind: NodeKind,
    /// Free text or markdown body
    #[serde(default)]
    pub content: String,
    /// Date the node entered the store
    #[serde(default = "today")]
    pub added_date: NaiveDate,
    /// Publication year, used by the year filter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    /// Classification tags attached at creation
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub badges: Vec<Badge>,
    /// Cluster label used for grouping
    #[serde(default)]
    pub group: String,
    /// User-toggled star
    #[serde(default)]
    pub starred: bool,
    /// True only while the node lives in the suggestion overlay
    #[serde(default)]
    pub is_suggestion: bool,
    /// Why the collaborator proposed this node (suggestions only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

impl Node {
    /// Create a new node with a generated id and today's date
    pub fn new(label: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            label: label.into(),
            kind,
            content: String::new(),
            added_date: today(),
            year: None,
            badges: Vec::new(),
            group: String::new(),
            starred: false,
            is_suggestion: false,
            reason: None,
        }
    }

    /// Set an explicit id
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Set the content body
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    /// Set the publication year
    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    /// Set the badges
    pub fn with_badges(mut self, badges: Vec<Badge>) -> Self {
        self.badges = badges;
        self
    }

    /// Set the group label
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    /// Set the added date
    pub fn with_added_date(mut self, date: NaiveDate) -> Self {
        self.added_date = date;
        self
    }

    /// Mark the node as starred
    pub fn starred(mut self) -> Self {
        self.starred = true;
        self
    }

    /// Turn this node into an overlay suggestion
    pub fn into_suggestion(mut self, reason: Option<String>) -> Self {
        self.is_suggestion = true;
        self.group = SUGGESTION_GROUP.to_string();
        self.reason = reason;
        self
    }

    /// Case-insensitive substring match on label or content
    pub fn matches_text(&self, needle_lower: &str) -> bool {
        needle_lower.is_empty()
            || self.label.to_lowercase().contains(needle_lower)
            || self.content.to_lowercase().contains(needle_lower)
    }

    /// Whether any badge carries the given partition (case-insensitive)
    pub fn has_partition(&self, partition: &str) -> bool {
        self.badges.iter().any(|b| {
            b.partition
                .as_deref()
                .is_some_and(|p| p.eq_ignore_ascii_case(partition))
        })
    }
}

/// Group label carried by every overlay node
pub const SUGGESTION_GROUP: &str = "Suggestion";

/// Group label assigned to a suggestion when it is promoted
pub const PROMOTED_GROUP: &str = "New Research";

/// Kinds of research nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// A published paper or ingested document
    Paper,
    /// A free-form user note
    Note,
    /// A derived concept, method or finding
    Concept,
}

impl NodeKind {
    /// Get the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Paper => "paper",
            Self::Note => "note",
            Self::Concept => "concept",
        }
    }

    /// Parse from string
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "paper" | "document" | "article" => Some(Self::Paper),
            "note" => Some(Self::Note),
            "concept" | "idea" | "method" | "element" => Some(Self::Concept),
            _ => None,
        }
    }

    /// Get all node kinds
    pub fn all() -> &'static [NodeKind] {
        &[Self::Paper, Self::Note, Self::Concept]
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A classification tag on a paper (ranking tier, quartile, impact metric)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Badge {
    /// Badge category, e.g. "CAS", "JCR", "IF"
    pub category: String,
    /// Partition or quartile code, e.g. "Q1"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition: Option<String>,
    /// Free-form metric value, e.g. "5.2"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl Badge {
    /// Create a badge with only a category
    pub fn new(category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            partition: None,
            value: None,
        }
    }

    /// Create a badge carrying a partition code
    pub fn partitioned(category: impl Into<String>, partition: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            partition: Some(partition.into()),
            value: None,
        }
    }

    /// Set the metric value
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Short display label, e.g. "CAS Q1" or "IF 5.2"
    pub fn label(&self) -> String {
        match (&self.partition, &self.value) {
            (Some(p), _) => format!("{} {}", self.category, p),
            (None, Some(v)) => format!("{} {}", self.category, v),
            (None, None) => self.category.clone(),
        }
    }
}

/// Input for creating a canonical node through the store
///
/// The store stamps the date and computes the group.
#[derive(Debug, Clone, Default)]
pub struct NodeDraft {
    pub id: Option<String>,
    pub label: String,
    pub kind: Option<NodeKind>,
    pub content: String,
    pub year: Option<i32>,
    pub badges: Vec<Badge>,
}

impl NodeDraft {
    /// Create a draft with a label and kind
    pub fn new(label: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            label: label.into(),
            kind: Some(kind),
            ..Default::default()
        }
    }

    /// Set an explicit id
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the content
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    /// Set the year
    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    /// Set the badges
    pub fn with_badges(mut self, badges: Vec<Badge>) -> Self {
        self.badges = badges;
        self
    }
}
