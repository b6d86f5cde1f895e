//! Viewer input: keyboard movement, cursor picking and mouse editing, all
//! mapped to high-level actions.
//!
//! # Invariants
//! - Consumers see actions, never raw window events.
//! - Picking rounds to cells the same way on both sides of the origin.

pub mod action;
mod movement;
mod picking;

pub use action::{Action, PointerButtons};
pub use movement::MoveKeys;
pub use picking::pick_cell;
