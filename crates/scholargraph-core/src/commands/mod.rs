//! Commands module - shell-facing helpers
//!
//! Used by the CLI: snapshot import/export and text renderings.

pub mod graph;
pub mod snapshot;

pub use graph::{
    NodeDetail, describe_node, node_detail, render_detail, render_positions, render_stats,
};
pub use snapshot::GraphSnapshot;
