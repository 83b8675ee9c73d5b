//! Canonical research graph
//!
//! - **Node / Link**: one entity type for both canonical and suggested items
//! - **GraphStore**: the single owner of confirmed nodes and links
//! - **Grouping**: deterministic cluster labels computed at insertion
//! - **GraphEvent**: audit trail of every mutation

mod event;
mod grouping;
mod link;
mod node;
mod store;

pub use event::GraphEvent;
pub use grouping::{
    GroupingRules, KeywordGroup, NOTES_GROUP, UNCATEGORIZED_GROUP, assign_group,
};
pub use link::{CONTAINS_LABEL, Link, LinkDirection};
pub use node::{Badge, Node, NodeDraft, NodeKind, PROMOTED_GROUP, SUGGESTION_GROUP};
pub use store::{GraphStats, GraphStore, LinkInsertion};
