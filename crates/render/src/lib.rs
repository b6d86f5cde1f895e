//! Rendering Adapter: renderer-agnostic frame description.
//!
//! # Invariants
//! - Renderers never mutate the tile store or the cameras.
//! - A frame view is captured after the camera update and window reconcile
//!   of the same frame.

mod renderer;

pub use renderer::{DebugTextRenderer, FrameView, Renderer};
