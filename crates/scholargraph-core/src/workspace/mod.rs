//! Engine orchestration
//!
//! [`GraphState`] aggregates store, overlay, filters, layout and selection
//! behind one lock; [`ResearchWorkspace`] runs the collaborator flows
//! against it.

mod research;
mod state;

pub use research::{MIN_NODES_FOR_GENERATION, ResearchWorkspace, SearchOutcome};
pub use state::{ConnectReport, GraphState, IngestReport};
