//! Layout simulation
//!
//! Continuously refines 2-D coordinates for the visible node set. The
//! simulation is a small state machine (`Idle`, `Settling`, `Dragging`)
//! driven by visible-set changes and drag events.

mod driver;
mod simulation;
mod vector;

pub use driver::{DEFAULT_FRAME, LayoutDriver, LayoutHost};
pub use simulation::{LayoutConfig, LayoutPhase, LayoutSimulation, NodePosition};
pub use vector::Vec2;
