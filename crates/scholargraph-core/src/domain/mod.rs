//! Domain layer
//!
//! The research graph engine: canonical store, suggestion overlay, filter
//! pipeline, layout simulation and the selection surface.

pub mod filter;
pub mod graph;
pub mod layout;
pub mod selection;
pub mod suggestion;
