//! Filter state for the visible graph
//!
//! The four standard filters are independent predicates combined with AND,
//! so the order in which they are applied never changes the result.

use serde::{Deserialize, Serialize};

use crate::domain::graph::Node;

/// Year filter values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", content = "year", rename_all = "snake_case")]
pub enum YearFilter {
    /// Every node passes
    #[default]
    All,
    /// Only nodes published in this year
    Exact(i32),
    /// Only nodes published strictly before this year
    OlderThan(i32),
}

impl YearFilter {
    /// Parse shell input: `all`, `2021`, `<2018` or `older:2018`
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("all") {
            return Some(Self::All);
        }
        if let Some(rest) = s.strip_prefix('<').or_else(|| s.strip_prefix("older:")) {
            return rest.trim().parse().ok().map(Self::OlderThan);
        }
        s.parse().ok().map(Self::Exact)
    }

    pub fn is_active(&self) -> bool {
        !matches!(self, Self::All)
    }

    /// Nodes without a year never pass an active year filter
    pub fn matches(&self, year: Option<i32>) -> bool {
        match (self, year) {
            (Self::All, _) => true,
            (Self::Exact(want), Some(y)) => y == *want,
            (Self::OlderThan(threshold), Some(y)) => y < *threshold,
            (_, None) => false,
        }
    }
}

/// One of the four standard filters
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StandardFilter {
    /// Case-insensitive substring match on label or content (stored lowercase)
    Text(String),
    /// Badge partition code
    Partition(String),
    Year(YearFilter),
    Starred,
}

impl StandardFilter {
    pub fn matches(&self, node: &Node) -> bool {
        match self {
            Self::Text(needle) => node.matches_text(needle),
            Self::Partition(code) => node.has_partition(code),
            Self::Year(filter) => filter.matches(node.year),
            Self::Starred => node.starred,
        }
    }
}

/// Active filter and search state
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FilterState {
    /// Free-text query
    #[serde(default)]
    pub query: String,
    /// Partition code, `None` means all partitions
    #[serde(default)]
    pub partition: Option<String>,
    #[serde(default)]
    pub year: YearFilter,
    #[serde(default)]
    pub starred_only: bool,
    /// Include the suggestion overlay
    #[serde(default)]
    pub show_suggestions: bool,
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = query.into();
        self
    }

    pub fn with_partition(mut self, partition: impl Into<String>) -> Self {
        self.partition = Some(partition.into());
        self
    }

    pub fn with_year(mut self, year: YearFilter) -> Self {
        self.year = year;
        self
    }

    pub fn starred_only(mut self) -> Self {
        self.starred_only = true;
        self
    }

    pub fn with_suggestions(mut self, show: bool) -> Self {
        self.show_suggestions = show;
        self
    }

    /// Active standard filters; inactive ones are omitted
    pub fn active_filters(&self) -> Vec<StandardFilter> {
        let mut filters = Vec::new();
        let query = self.query.trim();
        if !query.is_empty() {
            filters.push(StandardFilter::Text(query.to_lowercase()));
        }
        if let Some(partition) = self.partition.as_deref().map(str::trim)
            && !partition.is_empty()
            && !partition.eq_ignore_ascii_case("all")
        {
            filters.push(StandardFilter::Partition(partition.to_string()));
        }
        if self.year.is_active() {
            filters.push(StandardFilter::Year(self.year));
        }
        if self.starred_only {
            filters.push(StandardFilter::Starred);
        }
        filters
    }

    /// Whether a node survives every active standard filter
    pub fn matches(&self, node: &Node) -> bool {
        self.active_filters().iter().all(|f| f.matches(node))
    }

    /// No standard filter is active and suggestions are hidden
    pub fn is_default(&self) -> bool {
        self.active_filters().is_empty() && !self.show_suggestions
    }

    /// Reset the standard filters, keeping suggestion mode
    pub fn clear(&mut self) {
        let show_suggestions = self.show_suggestions;
        *self = Self {
            show_suggestions,
            ..Self::default()
        };
    }
}

/// Distinct partition codes present on the given nodes, sorted
pub fn available_partitions<'a>(nodes: impl IntoIterator<Item = &'a Node>) -> Vec<String> {
    let mut codes: Vec<String> = nodes
        .into_iter()
        .flat_map(|n| n.badges.iter().filter_map(|b| b.partition.clone()))
        .collect();
    codes.sort();
    codes.dedup();
    codes
}

/// Distinct publication years, newest first
pub fn available_years<'a>(nodes: impl IntoIterator<Item = &'a Node>) -> Vec<i32> {
    let mut years: Vec<i32> = nodes.into_iter().filter_map(|n| n.year).collect();
    years.sort_unstable_by(|a, b| b.cmp(a));
    years.dedup();
    years
}
