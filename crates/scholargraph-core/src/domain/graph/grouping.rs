//! Deterministic cluster assignment
//!
//! Groups are computed once at insertion time from `(kind, badges, label)`:
//!
//! 1. Notes always land in "Personal Notes".
//! 2. Badged nodes take the category of the first partitioned badge (or the
//!    first badge), suffixed by its partition.
//! 3. Otherwise the label is scanned against an ordered keyword table; the
//!    first matching entry wins, else the fallback label.

use serde::{Deserialize, Serialize};

use super::node::{Badge, NodeKind};

/// Group for every note
pub const NOTES_GROUP: &str = "Personal Notes";

/// Fallback when no keyword table is configured
pub const UNCATEGORIZED_GROUP: &str = "Uncategorized";

/// One row of the keyword table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordGroup {
    /// Lowercase keywords; any match selects the group
    pub keywords: Vec<String>,
    /// Group label
    pub group: String,
}

impl KeywordGroup {
    pub fn new(keywords: &[&str], group: impl Into<String>) -> Self {
        Self {
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
            group: group.into(),
        }
    }

    fn matches(&self, label_lower: &str) -> bool {
        self.keywords
            .iter()
            .any(|k| !k.is_empty() && label_lower.contains(&k.to_lowercase()))
    }
}

/// Ordered keyword table plus fallback label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupingRules {
    /// Label for nodes no keyword matches
    pub fallback: String,
    /// Checked in order; the first match wins
    pub keyword_groups: Vec<KeywordGroup>,
}

impl Default for GroupingRules {
    fn default() -> Self {
        Self::research_ai()
    }
}

impl GroupingRules {
    /// Keyword table for AI research libraries
    pub fn research_ai() -> Self {
        Self {
            keyword_groups: vec![
                KeywordGroup::new(&["hierarchical", "ensemble"], "Ensemble Learning"),
                KeywordGroup::new(&["quantum", "physics"], "Quantum AI"),
                KeywordGroup::new(&["medical", "biomedical"], "Healthcare"),
                KeywordGroup::new(
                    &["transformer", "attention", "language model"],
                    "Language Models",
                ),
                KeywordGroup::new(&["graph neural", "gnn", "knowledge graph"], "Graph Learning"),
                KeywordGroup::new(&["vision", "image", "visual"], "Computer Vision"),
                KeywordGroup::new(&["reinforcement", "policy gradient"], "Reinforcement Learning"),
            ],
            fallback: "General AI".to_string(),
        }
    }

    /// No keyword table; unmatched nodes become "Uncategorized"
    pub fn empty() -> Self {
        Self {
            keyword_groups: Vec::new(),
            fallback: UNCATEGORIZED_GROUP.to_string(),
        }
    }

    /// Assign a group to a node description
    pub fn assign(&self, kind: NodeKind, badges: &[Badge], label: &str) -> String {
        if kind == NodeKind::Note {
            return NOTES_GROUP.to_string();
        }

        let chosen = badges
            .iter()
            .find(|b| b.partition.is_some())
            .or_else(|| badges.first());
        if let Some(badge) = chosen {
            return match &badge.partition {
                Some(partition) => format!("{} {}", badge.category, partition),
                None => badge.category.clone(),
            };
        }

        let label_lower = label.to_lowercase();
        self.keyword_groups
            .iter()
            .find(|g| g.matches(&label_lower))
            .map(|g| g.group.clone())
            .unwrap_or_else(|| {
                if self.fallback.is_empty() {
                    UNCATEGORIZED_GROUP.to_string()
                } else {
                    self.fallback.clone()
                }
            })
    }
}

/// Assign a group with the default research table
pub fn assign_group(kind: NodeKind, badges: &[Badge], label: &str) -> String {
    GroupingRules::default().assign(kind, badges, label)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notes_always_personal() {
        let badges = vec![Badge::partitioned("CAS", "Q1")];
        assert_eq!(
            assign_group(NodeKind::Note, &badges, "quantum ensemble"),
            NOTES_GROUP
        );
    }

    #[test]
    fn test_partitioned_badge_preferred() {
        let badges = vec![
            Badge::new("IF").with_value("4.1"),
            Badge::partitioned("JCR", "Q2"),
        ];
        assert_eq!(assign_group(NodeKind::Paper, &badges, "anything"), "JCR Q2");
    }

    #[test]
    fn test_first_badge_without_partition() {
        let badges = vec![Badge::new("IF").with_value("4.1"), Badge::new("Top")];
        assert_eq!(assign_group(NodeKind::Paper, &badges, "anything"), "IF");
    }

    #[test]
    fn test_keyword_order_first_match_wins() {
        // Matches both "ensemble" and "medical"; the table order decides
        assert_eq!(
            assign_group(NodeKind::Paper, &[], "Ensemble Methods for Medical Imaging"),
            "Ensemble Learning"
        );
        assert_eq!(
            assign_group(NodeKind::Concept, &[], "BIOMEDICAL entity linking"),
            "Healthcare"
        );
        assert_eq!(
            assign_group(NodeKind::Paper, &[], "Quantum advantage in sampling"),
            "Quantum AI"
        );
    }

    #[test]
    fn test_fallbacks() {
        assert_eq!(
            assign_group(NodeKind::Paper, &[], "A survey of everything"),
            "General AI"
        );
        assert_eq!(
            GroupingRules::empty().assign(NodeKind::Paper, &[], "Quantum"),
            UNCATEGORIZED_GROUP
        );
    }

    #[test]
    fn test_grouping_is_deterministic() {
        let badges = vec![Badge::partitioned("CAS", "Q3")];
        let rules = GroupingRules::default();
        let first = rules.assign(NodeKind::Paper, &badges, "Hierarchical RL");
        let second = rules.assign(NodeKind::Paper, &badges, "Hierarchical RL");
        assert_eq!(first, second);
    }
}
