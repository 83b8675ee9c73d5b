//! AI suggestion overlay
//!
//! Holds proposed nodes and links next to the canonical graph until the
//! user promotes or discards them.

mod engine;

pub use engine::{
    GenerationTicket, OverlayReplacement, Promotion, SuggestionBatch, SuggestionEngine,
    SuggestionPhase,
};
