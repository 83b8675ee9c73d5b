//! Filter & search pipeline
//!
//! Derives the visible node/link set from the canonical store, the
//! suggestion overlay, the standard filters and the semantic override.

mod pipeline;
mod query;
mod semantic;

pub use pipeline::{VisibleGraph, compute_visible};
pub use query::{FilterState, StandardFilter, YearFilter, available_partitions, available_years};
pub use semantic::{SearchTicket, SemanticSearch, SemanticStatus};
